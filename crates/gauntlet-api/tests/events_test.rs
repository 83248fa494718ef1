//! Integration tests for the event lifecycle routes.

mod common;

use axum::http::StatusCode;
use common::{EVENT_DATE, tenant_uri};
use serde_json::json;

#[tokio::test]
async fn test_start_event_round_trip() {
    let state = common::test_state();

    // POST /events with activate
    let (status, json) = common::post_json(
        &state,
        &tenant_uri("/events"),
        &json!({ "date": EVENT_DATE, "name": "March", "activate": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["date"], EVENT_DATE);
    assert_eq!(json["name"], "March");

    // GET /events/active
    let (status, json) = common::get_json(&state, &tenant_uri("/events/active")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"]["date"], EVENT_DATE);

    // GET /events
    let (status, json) = common::get_json(&state, &tenant_uri("/events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_without_activate_leaves_no_active_event() {
    let state = common::test_state();

    let (status, _) =
        common::post_json(&state, &tenant_uri("/events"), &json!({ "date": EVENT_DATE })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = common::get_json(&state, &tenant_uri("/events/active")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["active"].is_null());
}

#[tokio::test]
async fn test_duplicate_event_returns_409() {
    let state = common::test_state();
    let body = json!({ "date": EVENT_DATE });
    common::post_json(&state, &tenant_uri("/events"), &body).await;

    let (status, json) = common::post_json(&state, &tenant_uri("/events"), &body).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "duplicate_event");
}

#[tokio::test]
async fn test_malformed_date_returns_400() {
    let state = common::test_state();

    let (status, json) =
        common::post_json(&state, &tenant_uri("/events"), &json!({ "date": "25/03/2026" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_event_date");
}

#[tokio::test]
async fn test_malformed_tenant_returns_400() {
    let state = common::test_state();

    let (status, json) = common::get_json(&state, "/api/v1/tenants/bad.tenant/events").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_activate_unknown_event_returns_404() {
    let state = common::test_state();

    let (status, json) =
        common::post_empty(&state, &tenant_uri("/events/2030-01-01/activate")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_event");
}

#[tokio::test]
async fn test_delete_active_event_removes_runs_and_pointer() {
    let state = common::test_state();
    common::seed_active_event(&state).await;
    common::submit(&state, "1001", json!(1000), false).await;

    let (status, _) = common::delete(&state, &tenant_uri(&format!("/events/{EVENT_DATE}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = common::get_json(&state, &tenant_uri("/events/active")).await;
    assert!(json["active"].is_null());
    let (status, json) =
        common::get_json(&state, &tenant_uri(&format!("/events/{EVENT_DATE}/runs"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_event");
}

#[tokio::test]
async fn test_tenants_do_not_see_each_other() {
    let state = common::test_state();
    common::seed_active_event(&state).await;

    let (status, json) = common::get_json(&state, "/api/v1/tenants/guild-2/events").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}
