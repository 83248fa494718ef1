//! Battle state routes: inspection and administrative recovery.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use gauntlet_battle::application::query_handlers::BattleStateView;
use gauntlet_battle::application::{command_handlers, query_handlers};
use gauntlet_battle::domain::battle_state::BattleState;
use gauntlet_battle::domain::commands;

use crate::error::ApiError;
use crate::routes::TenantPath;
use crate::state::AppState;

/// GET /battle-state
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id))]
async fn get_battle_state(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> Result<Json<BattleStateView>, ApiError> {
    let view =
        query_handlers::describe_battle_state(&path.tenant_id()?, &state.tenants, &state.boss_tables)
            .await?;
    Ok(Json(view))
}

/// POST /battle-state/reset
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id))]
async fn reset_battle_state(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> Result<StatusCode, ApiError> {
    let command = commands::ResetBattleState {
        correlation_id: Uuid::new_v4(),
        tenant_id: path.tenant_id()?,
    };

    info!(correlation_id = %command.correlation_id, "handling reset_battle_state command");

    command_handlers::handle_reset_battle_state(&command, &state.tenants).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /battle-state/rebuild
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id))]
async fn rebuild_battle_state(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> Result<Json<BattleState>, ApiError> {
    let command = commands::RebuildBattleState {
        correlation_id: Uuid::new_v4(),
        tenant_id: path.tenant_id()?,
    };

    info!(correlation_id = %command.correlation_id, "handling rebuild_battle_state command");

    let rebuilt = command_handlers::handle_rebuild_battle_state(
        &command,
        state.clock.as_ref(),
        &state.tenants,
        &state.boss_tables,
    )
    .await?;
    Ok(Json(rebuilt))
}

/// Returns the router for battle state routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/battle-state", get(get_battle_state))
        .route("/battle-state/reset", post(reset_battle_state))
        .route("/battle-state/rebuild", post(rebuild_battle_state))
}
