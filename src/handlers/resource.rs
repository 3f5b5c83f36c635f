//! Resource CRUD handlers: list, create, read, update, delete. The collection
//! is resolved from the path segment; unknown segments are 404s.

use crate::error::AppError;
use crate::response;
use crate::schema::{ColumnDef, ColumnKind, ResourcePayload, TableName};
use crate::service::RequestValidator;
use crate::state::AppState;
use crate::store::{ListParams, OrderBy};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum::Json;
use serde_json::Value;
use std::collections::HashMap;

pub(crate) fn resolve_table(segment: &str) -> Result<TableName, AppError> {
    TableName::from_path(segment).ok_or_else(|| AppError::NotFound(segment.to_string()))
}

pub(crate) fn body_to_map(value: Value) -> Result<ResourcePayload, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Coerce a query-string filter value to the column's JSON shape.
fn coerce_filter(col: &ColumnDef, raw: &str) -> Result<Value, AppError> {
    match col.kind {
        ColumnKind::Uuid => {
            uuid::Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest(format!("invalid uuid for filter '{}'", col.name)))?;
            Ok(Value::String(raw.to_string()))
        }
        ColumnKind::BigInt => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| AppError::BadRequest(format!("invalid integer for filter '{}'", col.name))),
        ColumnKind::Numeric => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| AppError::BadRequest(format!("invalid number for filter '{}'", col.name))),
        ColumnKind::Boolean => match raw {
            _ if raw.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            _ if raw.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(AppError::BadRequest(format!("invalid boolean for filter '{}'", col.name))),
        },
        ColumnKind::Text | ColumnKind::Timestamptz | ColumnKind::Jsonb => {
            Ok(Value::String(raw.to_string()))
        }
    }
}

/// `order=email` or `order=created_at.desc`.
fn parse_order(table: TableName, raw: &str) -> Result<OrderBy, AppError> {
    let (column, descending) = match raw.rsplit_once('.') {
        Some((col, "desc")) => (col, true),
        Some((col, "asc")) => (col, false),
        _ => (raw, false),
    };
    if !table.schema().has_column(column) {
        return Err(AppError::BadRequest(format!("unknown order column '{}'", column)));
    }
    Ok(OrderBy {
        column: column.to_string(),
        descending,
    })
}

fn parse_list_params(
    table: TableName,
    query: HashMap<String, String>,
) -> Result<ListParams, AppError> {
    let schema = table.schema();
    let mut params = ListParams::default();
    for (k, v) in query {
        match k.as_str() {
            "limit" => params.limit = v.parse().ok(),
            "offset" => params.offset = v.parse().ok(),
            "order" => params.order = Some(parse_order(table, &v)?),
            "include" => {
                for name in v.split(',').filter(|s| !s.is_empty()) {
                    let rel = schema
                        .relation(name)
                        .ok_or_else(|| AppError::BadRequest(format!("unknown include '{}'", name)))?;
                    params.includes.push(rel);
                }
            }
            _ => {
                if let Some(col) = schema.column(&k) {
                    params.filters.push((k, coerce_filter(col, &v)?));
                }
            }
        }
    }
    Ok(params)
}

pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let table = resolve_table(&segment)?;
    let params = parse_list_params(table, query)?;
    let rows = state.store.list(table, &params).await?;
    Ok(response::ok_many(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let table = resolve_table(&segment)?;
    let body = body_to_map(body)?;
    RequestValidator::validate(table, &body)?;
    let row = state.store.insert(table, &body).await?;
    Ok(response::created(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let table = resolve_table(&segment)?;
    let row = state
        .store
        .fetch(table, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id))?;
    Ok(response::ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let table = resolve_table(&segment)?;
    let body = body_to_map(body)?;
    RequestValidator::validate_partial(table, &body)?;
    let row = state
        .store
        .update(table, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(id))?;
    Ok(response::ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let table = resolve_table(&segment)?;
    state.store.delete(table, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
