//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gauntlet_api::config::BossTableSource;
use gauntlet_api::routes;
use gauntlet_api::state::AppState;
use gauntlet_battle::domain::boss_table::{BossTable, BossTableHandle};
use gauntlet_core::clock::Clock;
use gauntlet_core::tenant::TenantRouter;
use gauntlet_store::SqliteStoreOpener;
use gauntlet_test_support::{SAMPLE_BOSS_DATA, SteppingClock};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const TENANT: &str = "guild-1";
pub const EVENT_DATE: &str = "2026-03-25";

/// Clock advancing one second per reading, so ledger order is stable.
fn stepping_clock() -> Arc<dyn Clock> {
    Arc::new(SteppingClock::new(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 3, 25, 5, 0, 0).unwrap(),
        chrono::Duration::seconds(1),
    ))
}

/// App state over in-memory SQLite tenant databases and the `pcr_jp` sample
/// boss table.
pub fn test_state() -> AppState {
    test_state_with_source(None)
}

/// Like [`test_state`], with a boss table file that can be reloaded.
pub fn test_state_with_source(source: Option<BossTableSource>) -> AppState {
    let tenants = Arc::new(TenantRouter::new(Arc::new(SqliteStoreOpener::in_memory())));
    let table = BossTable::from_yaml_str(SAMPLE_BOSS_DATA, "pcr_jp").unwrap();
    AppState::new(stepping_clock(), tenants, BossTableHandle::new(table), source)
}

/// Build the full app router over `state`. Uses the same route structure as
/// `main.rs`. State is shared, so several apps built from one state see the
/// same tenants.
pub fn build_test_app(state: &AppState) -> Router {
    routes::app_router().with_state(state.clone())
}

/// URI of a tenant-scoped route.
pub fn tenant_uri(path: &str) -> String {
    format!("/api/v1/tenants/{TENANT}{path}")
}

/// Send a request and return the status and JSON body (`Null` when empty).
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    state: &AppState,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(build_test_app(state), "POST", uri, Some(body)).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(state: &AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    send(build_test_app(state), "POST", uri, None).await
}

/// Send a GET request and return the response.
pub async fn get_json(state: &AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    send(build_test_app(state), "GET", uri, None).await
}

/// Send a DELETE request and return the response.
pub async fn delete(state: &AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    send(build_test_app(state), "DELETE", uri, None).await
}

/// Starts `EVENT_DATE` for `TENANT` and enrolls members `1001` and `1002`.
pub async fn seed_active_event(state: &AppState) {
    let (status, _) = post_json(
        state,
        &tenant_uri("/events"),
        &serde_json::json!({ "date": EVENT_DATE, "activate": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    for (member_id, name) in [("1001", "Pecorine"), ("1002", "Kokkoro")] {
        let (status, _) = post_json(
            state,
            &tenant_uri("/members"),
            &serde_json::json!({ "member_id": member_id, "name": name }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

/// Submits a run and returns the response.
pub async fn submit(
    state: &AppState,
    member_id: &str,
    damage: serde_json::Value,
    finishing_blow: bool,
) -> (StatusCode, serde_json::Value) {
    post_json(
        state,
        &tenant_uri("/runs"),
        &serde_json::json!({
            "member_id": member_id,
            "damage": damage,
            "finishing_blow": finishing_blow,
        }),
    )
    .await
}
