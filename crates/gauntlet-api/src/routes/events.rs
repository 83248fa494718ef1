//! Event lifecycle routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use gauntlet_battle::application::query_handlers::EventView;
use gauntlet_battle::application::{command_handlers, query_handlers};
use gauntlet_battle::domain::commands;
use gauntlet_battle::domain::run::RunView;
use gauntlet_core::ids::EventDate;

use crate::error::ApiError;
use crate::routes::{TenantPath, parse_tenant_id};
use crate::state::AppState;

/// Path parameters of routes addressing one event.
#[derive(Debug, Deserialize)]
pub struct EventPath {
    /// Raw tenant identifier.
    pub tenant_id: String,
    /// Raw event date.
    pub date: String,
}

/// Request body for POST /events.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event date, `YYYY-MM-DD`.
    pub date: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Also make the new event the active one.
    #[serde(default)]
    pub activate: bool,
}

/// Response body for GET /events/active.
#[derive(Debug, Serialize)]
pub struct ActiveEventResponse {
    /// The active event, or `null` when none is active.
    pub active: Option<EventView>,
}

/// POST /events
#[instrument(skip(state, path, request), fields(tenant_id = %path.tenant_id, date = %request.date))]
async fn create_event(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventView>), ApiError> {
    let command = commands::CreateEvent {
        correlation_id: Uuid::new_v4(),
        tenant_id: path.tenant_id()?,
        date: EventDate::parse(&request.date)?,
        name: request.name,
        activate: request.activate,
    };

    info!(correlation_id = %command.correlation_id, "handling create_event command");

    let event =
        command_handlers::handle_create_event(&command, state.clock.as_ref(), &state.tenants)
            .await?;

    Ok((StatusCode::CREATED, Json(EventView::from(event))))
}

/// GET /events
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id))]
async fn list_events(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> Result<Json<Vec<EventView>>, ApiError> {
    let events = query_handlers::list_events(&path.tenant_id()?, &state.tenants).await?;
    Ok(Json(events))
}

/// GET /events/active
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id))]
async fn get_active_event(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> Result<Json<ActiveEventResponse>, ApiError> {
    let active = query_handlers::get_active_event(&path.tenant_id()?, &state.tenants).await?;
    Ok(Json(ActiveEventResponse { active }))
}

/// DELETE /events/{date}
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id, date = %path.date))]
async fn delete_event(
    State(state): State<AppState>,
    Path(path): Path<EventPath>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteEvent {
        correlation_id: Uuid::new_v4(),
        tenant_id: parse_tenant_id(&path.tenant_id)?,
        date: EventDate::parse(&path.date)?,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_event command");

    command_handlers::handle_delete_event(&command, &state.tenants).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /events/{date}/activate
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id, date = %path.date))]
async fn activate_event(
    State(state): State<AppState>,
    Path(path): Path<EventPath>,
) -> Result<Json<EventView>, ApiError> {
    let command = commands::SetActiveEvent {
        correlation_id: Uuid::new_v4(),
        tenant_id: parse_tenant_id(&path.tenant_id)?,
        date: EventDate::parse(&path.date)?,
    };

    info!(correlation_id = %command.correlation_id, "handling set_active_event command");

    let event = command_handlers::handle_set_active_event(&command, &state.tenants).await?;
    Ok(Json(EventView::from(event)))
}

/// GET /events/{date}/runs
#[instrument(skip(state, path), fields(tenant_id = %path.tenant_id, date = %path.date))]
async fn list_runs(
    State(state): State<AppState>,
    Path(path): Path<EventPath>,
) -> Result<Json<Vec<RunView>>, ApiError> {
    let runs = query_handlers::list_runs(
        &parse_tenant_id(&path.tenant_id)?,
        EventDate::parse(&path.date)?,
        &state.tenants,
    )
    .await?;
    Ok(Json(runs))
}

/// Returns the router for event routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/active", get(get_active_event))
        .route("/events/{date}", delete(delete_event))
        .route("/events/{date}/activate", post(activate_event))
        .route("/events/{date}/runs", get(list_runs))
}
