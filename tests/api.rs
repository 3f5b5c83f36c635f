//! REST and admin surfaces over the in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use backoffice_api::schema::{Member, Organization};
use backoffice_api::{
    admin_routes, api_routes, common_routes_with_ready, AppState, MemoryRowStore, StalePaths,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, StalePaths) {
    let stale = StalePaths::new();
    let state = AppState::new(Arc::new(MemoryRowStore::new()), Arc::new(stale.clone()));
    let router = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api", api_routes(state.clone()))
        .nest("/admin", admin_routes(state));
    (router, stale)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(v) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn create_read_update_delete_round_trip() {
    let (router, _) = app();

    let (status, body) = send(
        &router,
        "POST",
        "/api/organizations",
        Some(json!({"name": "Acme"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], json!("Acme"));
    let org: Organization = serde_json::from_value(body["data"].clone()).unwrap();
    let id = org.id.to_string();

    let (status, body) = send(&router, "GET", &format!("/api/organizations/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"].as_str(), Some(id.as_str()));

    let (status, body) = send(
        &router,
        "PATCH",
        &format!("/api/organizations/{}", id),
        Some(json!({"name": "Acme Corp"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Acme Corp"));

    let (status, _) = send(&router, "DELETE", &format!("/api/organizations/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&router, "GET", &format!("/api/organizations/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn list_supports_filters_order_and_includes() {
    let (router, _) = app();

    let (_, org) = send(
        &router,
        "POST",
        "/api/organizations",
        Some(json!({"name": "Acme"})),
    )
    .await;
    let org_id = org["data"]["id"].as_str().unwrap().to_string();

    for (email, status) in [
        ("carol@example.com", "active"),
        ("alice@example.com", "active"),
        ("bob@example.com", "inactive"),
    ] {
        let (code, _) = send(
            &router,
            "POST",
            "/api/members",
            Some(json!({"email": email, "status": status, "organization_id": org_id.as_str()})),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, body) = send(&router, "GET", "/api/members?status=active&order=email", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], json!(2));
    assert_eq!(body["data"][0]["email"], json!("alice@example.com"));
    assert_eq!(body["data"][1]["email"], json!("carol@example.com"));
    let row: Member = serde_json::from_value(body["data"][0].clone()).unwrap();
    assert_eq!(row.status, "active");
    assert_eq!(row.organization_id.unwrap().to_string(), org_id);

    let (status, body) = send(
        &router,
        "GET",
        "/api/members?include=organization&order=email.desc&limit=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["email"], json!("carol@example.com"));
    assert_eq!(body["data"][0]["organization"]["name"], json!("Acme"));
}

#[tokio::test]
async fn unknown_resource_and_bad_queries_are_rejected() {
    let (router, _) = app();

    let (status, body) = send(&router, "GET", "/api/widgets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));

    let (status, body) = send(&router, "GET", "/api/members?include=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));

    let (status, _) = send(&router, "GET", "/api/members?order=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "GET",
        "/api/members?organization_id=not-a-uuid",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rejects_invalid_payloads() {
    let (router, _) = app();

    let (status, body) = send(&router, "POST", "/api/members", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_error"));

    let (status, _) = send(
        &router,
        "POST",
        "/api/organizations",
        Some(json!({"name": "Acme", "bogus": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &router,
        "POST",
        "/api/organizations",
        Some(json!(["not", "an", "object"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_missing_row_is_not_found() {
    let (router, _) = app();
    let (status, _) = send(
        &router,
        "PATCH",
        "/api/organizations/org-404",
        Some(json!({"name": "Ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_actions_return_the_action_result_and_mark_paths_stale() {
    let (router, stale) = app();

    let (status, body) = send(
        &router,
        "POST",
        "/admin/organizations",
        Some(json!({"name": "Acme"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert!(stale.is_stale("/admin/organizations"));

    let (status, body) = send(
        &router,
        "POST",
        "/admin/organizations",
        Some(json!({"bogus": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Failed to create organizations"));

    assert!(stale.take("/admin/organizations"));
    let (_, listing) = send(&router, "GET", "/api/organizations", None).await;
    let id = listing["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        "POST",
        &format!("/admin/organizations/{}", id),
        Some(json!({"name": "Acme Corp"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert!(stale.is_stale("/admin/organizations"));

    let (status, body) = send(
        &router,
        "DELETE",
        &format!("/admin/organizations/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, listing) = send(&router, "GET", "/api/organizations", None).await;
    assert_eq!(listing["meta"]["count"], json!(0));
}

#[tokio::test]
async fn health_and_ready_respond() {
    let (router, _) = app();

    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (status, body) = send(&router, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], json!("ok"));

    let (status, body) = send(&router, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("backoffice-api"));
}
