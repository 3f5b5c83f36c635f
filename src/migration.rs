//! Apply the schema registry to the database: CREATE TABLE per collection in
//! dependency order, then foreign keys from the to-one relations.

use crate::error::AppError;
use crate::schema::{RelationKind, TableName, PK_COLUMN};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// CREATE TABLE IF NOT EXISTS for one collection.
pub fn create_table_ddl(table: TableName) -> String {
    let schema = table.schema();
    let cols: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote(c.name), c.kind.sql_type());
            if c.name == PK_COLUMN {
                def.push_str(" PRIMARY KEY");
            } else if !c.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(expr) = c.default_sql {
                def.push_str(" DEFAULT ");
                def.push_str(expr);
            }
            def
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(schema.name),
        cols.join(", ")
    )
}

/// ALTER TABLE ... ADD CONSTRAINT for each to-one relation of the collection.
pub fn foreign_key_ddl(table: TableName) -> Vec<String> {
    let schema = table.schema();
    schema
        .relations
        .iter()
        .filter(|r| r.kind == RelationKind::ToOne)
        .map(|r| {
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                quote(schema.name),
                quote(&format!("fk_{}_{}", schema.name, r.our_key)),
                quote(r.our_key),
                quote(r.target.schema().name),
                quote(r.their_key)
            )
        })
        .collect()
}

/// Create all tables, then add foreign keys. Table creation is idempotent;
/// constraint adds are ignored when already present (no IF NOT EXISTS form).
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    for table in TableName::ALL {
        let ddl = create_table_ddl(table);
        tracing::debug!(sql = %ddl, "migrate");
        sqlx::query(&ddl).execute(pool).await?;
    }
    for table in TableName::ALL {
        for ddl in foreign_key_ddl(table) {
            tracing::debug!(sql = %ddl, "migrate");
            let _ = sqlx::query(&ddl).execute(pool).await;
        }
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to
/// the default `postgres` database to run CREATE DATABASE. Call before
/// creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}
