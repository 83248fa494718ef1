//! Run submission route.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use gauntlet_battle::application::command_handlers;
use gauntlet_battle::domain::commands;
use gauntlet_battle::domain::run::{RawDamage, RunOutcome};
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::MemberId;

use crate::error::ApiError;
use crate::routes::TenantPath;
use crate::state::AppState;

/// Damage as sent by the client. Any JSON value is accepted here and
/// validated by the run handler after the active event check.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct DamageInput(serde_json::Value);

impl DamageInput {
    fn into_raw(self) -> RawDamage {
        match self.0 {
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => RawDamage::Integer(value),
                None => RawDamage::Text(number.to_string()),
            },
            serde_json::Value::String(text) => RawDamage::Text(text),
            other => RawDamage::Text(other.to_string()),
        }
    }
}

/// Request body for POST /runs.
#[derive(Debug, Deserialize)]
pub struct SubmitRunRequest {
    /// The submitting member.
    pub member_id: String,
    /// Damage dealt.
    #[serde(default)]
    pub damage: DamageInput,
    /// The round the member believes is current.
    pub round: Option<u32>,
    /// The member declares this run a finishing blow.
    #[serde(default)]
    pub finishing_blow: bool,
}

/// POST /runs
///
/// An overkill without the finishing-blow flag is still recorded as a lost
/// run but answered with 422.
#[instrument(
    skip(state, path, request),
    fields(tenant_id = %path.tenant_id, member_id = %request.member_id)
)]
async fn submit_run(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(request): Json<SubmitRunRequest>,
) -> Result<Json<RunOutcome>, ApiError> {
    let tenant_id = path.tenant_id()?;
    let member_id = request.member_id.trim();
    if member_id.is_empty() {
        return Err(DomainError::Validation("member_id must not be empty".into()).into());
    }
    let command = commands::SubmitRun {
        correlation_id: Uuid::new_v4(),
        tenant_id,
        member_id: MemberId::new(member_id),
        declared_round: request.round,
        damage: request.damage.into_raw(),
        finishing_blow: request.finishing_blow,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_run command");

    let outcome = command_handlers::handle_submit_run(
        &command,
        state.clock.as_ref(),
        &state.tenants,
        state.roster.as_ref(),
        &state.boss_tables,
    )
    .await?;

    Ok(Json(outcome.into_result()?))
}

/// Returns the router for run routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/runs", post(submit_run))
}
