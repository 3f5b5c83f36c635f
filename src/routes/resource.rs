//! Resource routes. Parameterized paths: handlers resolve the collection from
//! the segment, so one route set serves every resource.

use crate::handlers::admin::{create_action, delete_action, edit_action};
use crate::handlers::resource::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

/// REST CRUD surface, mounted under e.g. `/api`.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create))
        .route(
            "/:resource/:id",
            get(read).patch(update).delete(delete_handler),
        )
        .with_state(state)
}

/// Admin form-action surface, mounted under `/admin`. Mutations here go
/// through the resource actions and invalidate the resource's listing path.
pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", post(create_action))
        .route("/:resource/:id", post(edit_action).delete(delete_action))
        .with_state(state)
}
