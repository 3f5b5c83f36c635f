//! PostgreSQL row store over sqlx.

use super::{ListParams, RowStore};
use crate::error::StoreError;
use crate::schema::{ColumnKind, RelationDef, ResourcePayload, TableName, TableSchema};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    pub fn new(pool: PgPool) -> Self {
        PgRowStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn parse_id(id: &str) -> Result<Value, StoreError> {
        uuid::Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
        Ok(Value::String(id.to_string()))
    }

    async fn fetch_optional_row(
        &self,
        schema: &TableSchema,
        includes: &[&'static RelationDef],
        q: &QueryBuf,
    ) -> Result<Option<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(&self.pool).await.map_err(map_db_error)?;
        row.map(|r| decode_row(schema, includes, &r)).transpose()
    }

    async fn fetch_all_rows(
        &self,
        schema: &TableSchema,
        includes: &[&'static RelationDef],
        q: &QueryBuf,
    ) -> Result<Vec<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
        rows.iter().map(|r| decode_row(schema, includes, r)).collect()
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn insert(&self, table: TableName, row: &ResourcePayload) -> Result<Value, StoreError> {
        let schema = table.schema();
        let q = sql::insert(schema, row);
        self.fetch_optional_row(schema, &[], &q)
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        table: TableName,
        id: &str,
        changes: &ResourcePayload,
    ) -> Result<Option<Value>, StoreError> {
        let schema = table.schema();
        let id = Self::parse_id(id)?;
        let q = sql::update(schema, &id, changes);
        self.fetch_optional_row(schema, &[], &q).await
    }

    async fn delete(&self, table: TableName, id: &str) -> Result<Option<Value>, StoreError> {
        let schema = table.schema();
        let id = Self::parse_id(id)?;
        let q = sql::delete(schema, &id);
        self.fetch_optional_row(schema, &[], &q).await
    }

    async fn fetch(&self, table: TableName, id: &str) -> Result<Option<Value>, StoreError> {
        let schema = table.schema();
        let id = Self::parse_id(id)?;
        let q = sql::select_by_id(schema, &id);
        self.fetch_optional_row(schema, &[], &q).await
    }

    async fn list(&self, table: TableName, params: &ListParams) -> Result<Vec<Value>, StoreError> {
        let schema = table.schema();
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let order = params.order.as_ref().map(|o| (o.column.as_str(), o.descending));
        let q = sql::select_list(
            schema,
            &params.filters,
            order,
            Some(limit),
            Some(params.offset.unwrap_or(0)),
            &params.includes,
        );
        self.fetch_all_rows(schema, &params.includes, &q).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Db)?;
        Ok(())
    }
}

/// Unique / FK / not-null / check rejections become [`StoreError::Constraint`];
/// everything else stays a database error.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        use sqlx::error::ErrorKind;
        match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => return StoreError::Constraint(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::Db(e)
}

fn decode_row(
    schema: &TableSchema,
    includes: &[&'static RelationDef],
    row: &PgRow,
) -> Result<Value, StoreError> {
    let mut out = Map::new();
    for c in schema.columns {
        out.insert(c.name.to_string(), decode_column(row, c.name, c.kind)?);
    }
    for inc in includes {
        let v: Option<Value> = row.try_get(inc.name)?;
        out.insert(inc.name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(Value::Object(out))
}

fn decode_column(row: &PgRow, name: &str, kind: ColumnKind) -> Result<Value, StoreError> {
    let v = match kind {
        ColumnKind::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(name)?
            .map(|u| Value::String(u.to_string())),
        ColumnKind::Text => row.try_get::<Option<String>, _>(name)?.map(Value::String),
        ColumnKind::Timestamptz => row
            .try_get::<Option<DateTime<Utc>>, _>(name)?
            .map(|d| Value::String(d.to_rfc3339())),
        ColumnKind::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        ColumnKind::BigInt => row
            .try_get::<Option<i64>, _>(name)?
            .map(|n| Value::Number(n.into())),
        ColumnKind::Numeric => row.try_get::<Option<String>, _>(name)?.map(decode_numeric),
        ColumnKind::Jsonb => row.try_get::<Option<Value>, _>(name)?,
    };
    Ok(v.unwrap_or(Value::Null))
}

/// Numeric columns are selected as text; surface them as JSON numbers when
/// they fit, else keep the exact text.
fn decode_numeric(s: String) -> Value {
    match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(s),
    }
}
