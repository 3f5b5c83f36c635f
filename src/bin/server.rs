//! Back-office server: ensures the database and tables exist, then mounts the
//! common, REST, and admin routes over a PostgreSQL row store.

use backoffice_api::{
    admin_routes, api_routes, apply_migrations, common_routes_with_ready, ensure_database_exists,
    AppState, PgRowStore, StalePaths,
};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("backoffice_api=info".parse()?),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/backoffice".into());
    ensure_database_exists(&database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    apply_migrations(&pool).await?;

    let state = AppState::new(
        Arc::new(PgRowStore::new(pool)),
        Arc::new(StalePaths::new()),
    );

    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api", api_routes(state.clone()))
        .nest("/admin", admin_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
