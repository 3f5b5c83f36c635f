//! Admin form-action handlers: thin wrappers over the resource actions.
//! Responses are always 200 with the serialized [`ActionResult`]; the admin
//! UI branches on `success` and shows `error` as a toast.

use crate::actions::{create_resource, delete_resource, edit_resource, ActionResult};
use crate::error::AppError;
use crate::handlers::resource::{body_to_map, resolve_table};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

fn redirect_path(segment: &str) -> String {
    format!("/admin/{}", segment)
}

pub async fn create_action(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ActionResult>, AppError> {
    let table = resolve_table(&segment)?;
    let data = body_to_map(body)?;
    let result = create_resource(
        state.store.as_ref(),
        state.invalidator.as_ref(),
        table,
        &redirect_path(&segment),
        data,
    )
    .await;
    Ok(Json(result))
}

pub async fn edit_action(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<ActionResult>, AppError> {
    let table = resolve_table(&segment)?;
    let data = body_to_map(body)?;
    let result = edit_resource(
        state.store.as_ref(),
        state.invalidator.as_ref(),
        table,
        &redirect_path(&segment),
        &id,
        data,
    )
    .await;
    Ok(Json(result))
}

pub async fn delete_action(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Json<ActionResult>, AppError> {
    let table = resolve_table(&segment)?;
    let result = delete_resource(
        state.store.as_ref(),
        state.invalidator.as_ref(),
        table,
        &redirect_path(&segment),
        &id,
    )
    .await;
    Ok(Json(result))
}
