//! Admin back-office backend: a closed set of relational collections, a
//! generic resource action layer, and a REST CRUD surface over one row store.

pub mod actions;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod revalidate;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use actions::{create_resource, delete_resource, edit_resource, ActionResult};
pub use error::{AppError, StoreError};
pub use migration::{apply_migrations, ensure_database_exists};
pub use revalidate::{PathInvalidator, StalePaths};
pub use routes::{admin_routes, api_routes, common_routes, common_routes_with_ready};
pub use schema::{ResourcePayload, TableName};
pub use service::RequestValidator;
pub use state::AppState;
pub use store::{ListParams, MemoryRowStore, OrderBy, PgRowStore, RowStore};
