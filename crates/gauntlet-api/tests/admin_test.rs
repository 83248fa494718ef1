//! Integration tests for the boss table reload route.

mod common;

use axum::http::StatusCode;
use common::tenant_uri;
use gauntlet_api::config::BossTableSource;
use gauntlet_test_support::SAMPLE_BOSS_DATA;
use serde_json::json;

const RELOAD_URI: &str = "/api/v1/admin/boss-table/reload";

#[tokio::test]
async fn test_reload_swaps_in_new_table() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boss_data.yaml");
    std::fs::write(&path, SAMPLE_BOSS_DATA).unwrap();
    let state = common::test_state_with_source(Some(BossTableSource {
        path,
        region: "pcr_small".into(),
    }));
    common::seed_active_event(&state).await;

    // Act
    let (status, json) = common::post_empty(&state, RELOAD_URI).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "reloaded");
    assert_eq!(json["region"], "pcr_small");
    let (_, view) = common::get_json(&state, &tenant_uri("/battle-state")).await;
    assert_eq!(view["max_hp"], 100);
    let (_, outcome) = common::submit(&state, "1001", json!(100), false).await;
    assert_eq!(outcome["boss"], 2);
    assert_eq!(outcome["remaining_hp_after"], 200);
}

const SMALLER_JP_TABLE: &str = "pcr_jp:\n  boss_hp:\n    A: [2000000, 2000000]\n";

fn state_with_file(contents: &str, region: &str) -> (tempfile::TempDir, gauntlet_api::state::AppState) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boss_data.yaml");
    std::fs::write(&path, contents).unwrap();
    let state = common::test_state_with_source(Some(BossTableSource {
        path,
        region: region.into(),
    }));
    (dir, state)
}

#[tokio::test]
async fn test_reload_mid_event_rebuilds_battle_state() {
    // Arrange
    let (_dir, state) = state_with_file(SMALLER_JP_TABLE, "pcr_jp");
    common::seed_active_event(&state).await;
    common::submit(&state, "1001", json!(1_000_000), false).await;

    // Act
    let (status, json) = common::post_empty(&state, RELOAD_URI).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tenants_rebuilt"], 1);
    let (_, view) = common::get_json(&state, &tenant_uri("/battle-state")).await;
    assert_eq!(view["remaining_hp"], 1_000_000);
    assert_eq!(view["max_hp"], 2_000_000);
    let (status, rebuilt) = common::post_empty(&state, &tenant_uri("/battle-state/rebuild")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rebuilt["remaining_hp"], 1_000_000);
}

#[tokio::test]
async fn test_reload_refused_when_progress_exceeds_new_pools() {
    // Arrange
    let (_dir, state) = state_with_file(SMALLER_JP_TABLE, "pcr_jp");
    common::seed_active_event(&state).await;
    common::submit(&state, "1001", json!(5_000_000), false).await;

    // Act
    let (status, json) = common::post_empty(&state, RELOAD_URI).await;

    // Assert
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "config_error");
    let (_, view) = common::get_json(&state, &tenant_uri("/battle-state")).await;
    assert_eq!(view["remaining_hp"], 1_000_000);
    assert_eq!(view["max_hp"], 6_000_000);
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_table() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boss_data.yaml");
    std::fs::write(&path, "pcr_jp:\n  boss_hp:\n    A: []\n").unwrap();
    let state = common::test_state_with_source(Some(BossTableSource {
        path,
        region: "pcr_jp".into(),
    }));
    common::seed_active_event(&state).await;

    // Act
    let (status, json) = common::post_empty(&state, RELOAD_URI).await;

    // Assert
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "config_error");
    let (_, view) = common::get_json(&state, &tenant_uri("/battle-state")).await;
    assert_eq!(view["max_hp"], 6_000_000);
}

#[tokio::test]
async fn test_reload_without_source_is_a_config_error() {
    let state = common::test_state();

    let (status, json) = common::post_empty(&state, RELOAD_URI).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "config_error");
}
