//! Create/edit/delete for any collection, behind one uniform result shape.
//!
//! These functions never raise: store rejections and bad payloads alike are
//! logged with their structured cause and collapsed into a coarse
//! [`ActionResult`], so form handlers only ever branch on `success`. On
//! success the redirect path is invalidated exactly once; on failure it is
//! left untouched.

use crate::error::StoreError;
use crate::revalidate::PathInvalidator;
use crate::schema::{ResourcePayload, TableName};
use crate::service::RequestValidator;
use crate::store::RowStore;
use serde::Serialize;

/// Uniform result of the three resource actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        ActionResult {
            success: true,
            error: None,
        }
    }

    fn failed(verb: &str, table: TableName) -> Self {
        ActionResult {
            success: false,
            error: Some(format!("Failed to {} {}", verb, table)),
        }
    }
}

/// Insert one row into `table`, then mark `redirect_path` stale.
pub async fn create_resource(
    store: &dyn RowStore,
    invalidator: &dyn PathInvalidator,
    table: TableName,
    redirect_path: &str,
    data: ResourcePayload,
) -> ActionResult {
    if let Err(err) = RequestValidator::validate(table, &data) {
        tracing::error!(table = %table, op = "create", error = %err, "resource action rejected");
        return ActionResult::failed("create", table);
    }
    match store.insert(table, &data).await {
        Ok(_) => {
            invalidator.invalidate(redirect_path);
            ActionResult::ok()
        }
        Err(err) => {
            log_store_error("create", table, &err);
            ActionResult::failed("create", table)
        }
    }
}

/// Update the row with primary key `id` with the fields present in `data`,
/// then mark `redirect_path` stale. A zero-row match is reported as success;
/// it only shows up in the logs.
pub async fn edit_resource(
    store: &dyn RowStore,
    invalidator: &dyn PathInvalidator,
    table: TableName,
    redirect_path: &str,
    id: &str,
    data: ResourcePayload,
) -> ActionResult {
    if let Err(err) = RequestValidator::validate_partial(table, &data) {
        tracing::error!(table = %table, op = "update", error = %err, "resource action rejected");
        return ActionResult::failed("update", table);
    }
    match store.update(table, id, &data).await {
        Ok(row) => {
            if row.is_none() {
                tracing::warn!(table = %table, id, "update matched no rows");
            }
            invalidator.invalidate(redirect_path);
            ActionResult::ok()
        }
        Err(err) => {
            log_store_error("update", table, &err);
            ActionResult::failed("update", table)
        }
    }
}

/// Delete the row with primary key `id`, then mark `redirect_path` stale.
/// Deleting a row that does not exist is reported as success.
pub async fn delete_resource(
    store: &dyn RowStore,
    invalidator: &dyn PathInvalidator,
    table: TableName,
    redirect_path: &str,
    id: &str,
) -> ActionResult {
    match store.delete(table, id).await {
        Ok(row) => {
            if row.is_none() {
                tracing::warn!(table = %table, id, "delete matched no rows");
            }
            invalidator.invalidate(redirect_path);
            ActionResult::ok()
        }
        Err(err) => {
            log_store_error("delete", table, &err);
            ActionResult::failed("delete", table)
        }
    }
}

fn log_store_error(op: &str, table: TableName, err: &StoreError) {
    tracing::error!(table = %table, op, kind = err.kind(), error = %err, "resource action failed");
}
