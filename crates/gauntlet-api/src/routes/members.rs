//! Roster routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use gauntlet_battle::application::query_handlers::{self, MemberView};
use gauntlet_battle::application::roster_handlers;
use gauntlet_battle::domain::commands;
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::MemberId;

use crate::error::ApiError;
use crate::routes::{TenantPath, parse_tenant_id};
use crate::state::AppState;

/// Path parameters of routes addressing one member.
#[derive(Debug, Deserialize)]
pub struct MemberPath {
    /// Raw tenant identifier.
    pub tenant_id: String,
    /// Member identifier.
    pub member_id: String,
}

/// Request body for POST /members.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// Member identifier.
    pub member_id: String,
    /// Account name.
    pub name: String,
    /// Optional display nickname.
    pub nick: Option<String>,
}

/// Response body for POST /members.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    /// The member.
    pub member_id: MemberId,
    /// `false` when the member was already on the roster.
    pub added: bool,
}

fn member_id(raw: &str) -> Result<MemberId, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DomainError::Validation("member_id must not be empty".into()).into());
    }
    Ok(MemberId::new(raw))
}

/// GET /members
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id))]
async fn list_members(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    let members = query_handlers::list_members(&path.tenant_id()?, &state.tenants).await?;
    Ok(Json(members))
}

/// POST /members
#[instrument(
    skip(state, path, request),
    fields(tenant_id = %path.tenant_id, member_id = %request.member_id)
)]
async fn join(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(request): Json<JoinRequest>,
) -> Result<(StatusCode, Json<JoinResponse>), ApiError> {
    let command = commands::JoinRoster {
        correlation_id: Uuid::new_v4(),
        tenant_id: path.tenant_id()?,
        member_id: member_id(&request.member_id)?,
        name: request.name,
        nick: request.nick,
    };

    info!(correlation_id = %command.correlation_id, "handling join_roster command");

    let added = roster_handlers::handle_join_roster(&command, &state.tenants).await?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(JoinResponse {
            member_id: command.member_id,
            added,
        }),
    ))
}

/// DELETE /members/{member_id}
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id, member_id = %path.member_id))]
async fn leave(
    State(state): State<AppState>,
    Path(path): Path<MemberPath>,
) -> Result<StatusCode, ApiError> {
    let command = commands::LeaveRoster {
        correlation_id: Uuid::new_v4(),
        tenant_id: parse_tenant_id(&path.tenant_id)?,
        member_id: member_id(&path.member_id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling leave_roster command");

    roster_handlers::handle_leave_roster(&command, &state.tenants).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for roster routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members).post(join))
        .route("/members/{member_id}", delete(leave))
}
