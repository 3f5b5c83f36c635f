//! Row-store abstraction. The backend is injected as an explicit handle; no
//! ambient connection or session state.

mod memory;
mod postgres;

pub use memory::MemoryRowStore;
pub use postgres::PgRowStore;

use crate::error::StoreError;
use crate::schema::{RelationDef, ResourcePayload, TableName};
use async_trait::async_trait;
use serde_json::Value;

/// Sort order for [`RowStore::list`].
#[derive(Clone, Debug)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// List query shape: exact-match filters, order, window, embedded relations.
#[derive(Clone, Debug, Default)]
pub struct ListParams {
    pub filters: Vec<(String, Value)>,
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub includes: Vec<&'static RelationDef>,
}

/// One entity collection store. Each call is a single request-response round
/// trip; ordering between concurrent calls is the backend's concern.
///
/// `update` and `delete` return `None` when no row matched, so callers can
/// observe zero-row mutations.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert one row; returns the created row (defaults filled in).
    async fn insert(&self, table: TableName, row: &ResourcePayload) -> Result<Value, StoreError>;

    /// Partial update of the row with the given primary key.
    async fn update(
        &self,
        table: TableName,
        id: &str,
        changes: &ResourcePayload,
    ) -> Result<Option<Value>, StoreError>;

    /// Delete the row with the given primary key; returns the removed row.
    async fn delete(&self, table: TableName, id: &str) -> Result<Option<Value>, StoreError>;

    /// Fetch one row by primary key.
    async fn fetch(&self, table: TableName, id: &str) -> Result<Option<Value>, StoreError>;

    /// List rows.
    async fn list(&self, table: TableName, params: &ListParams) -> Result<Vec<Value>, StoreError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
