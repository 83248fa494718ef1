//! Administrative routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use gauntlet_battle::application::command_handlers;
use gauntlet_battle::domain::commands;
use gauntlet_core::error::DomainError;
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for POST /boss-table/reload.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// Always `"reloaded"`.
    pub status: &'static str,
    /// The region whose table is now live.
    pub region: String,
    /// Revision of the live table.
    pub revision: String,
    /// Open tenants whose battle state was rebuilt against the new table.
    pub tenants_rebuilt: usize,
}

/// POST /boss-table/reload
///
/// Re-reads the boss data file and swaps the table in, rebuilding the battle
/// state of open tenants. On failure the previous table stays live.
#[instrument(skip(state))]
async fn reload_boss_table(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let source = state
        .boss_table_source
        .clone()
        .ok_or_else(|| DomainError::Config("boss table reload is not configured".into()))?;
    let region = source.region.clone();

    let table = tokio::task::spawn_blocking(move || source.load())
        .await
        .map_err(|e| DomainError::Infrastructure(format!("boss table reload aborted: {e}")))?
        .inspect_err(|e| error!(error = %e, "boss table reload failed"))?;

    let command = commands::ReloadBossTable {
        correlation_id: Uuid::new_v4(),
        table,
    };
    info!(correlation_id = %command.correlation_id, region = %region, "handling reload_boss_table command");

    let reload = command_handlers::handle_reload_boss_table(
        command,
        state.clock.as_ref(),
        &state.tenants,
        &state.boss_tables,
    )
    .await?;

    Ok(Json(ReloadResponse {
        status: "reloaded",
        region,
        revision: reload.revision,
        tenants_rebuilt: reload.tenants_rebuilt,
    }))
}

/// Returns the router for administrative routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/boss-table/reload", post(reload_boss_table))
}
