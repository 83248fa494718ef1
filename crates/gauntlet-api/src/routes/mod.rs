//! Route modules.
//!
//! Tenant-scoped routers are merged by [`tenant_router`] and nested under
//! `/api/v1/tenants/{tenant_id}`; their handlers read the tenant from the
//! path.

use axum::Router;
use gauntlet_core::ids::TenantId;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

pub mod admin;
pub mod battle_state;
pub mod events;
pub mod health;
pub mod members;
pub mod runs;

/// Path parameters of every tenant-scoped route.
#[derive(Debug, Deserialize)]
pub struct TenantPath {
    /// Raw tenant identifier.
    pub tenant_id: String,
}

impl TenantPath {
    /// Validates the tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns a 400 `ApiError` if the identifier is malformed.
    pub fn tenant_id(&self) -> Result<TenantId, ApiError> {
        parse_tenant_id(&self.tenant_id)
    }
}

/// Validates a raw tenant identifier taken from a path.
///
/// # Errors
///
/// Returns a 400 `ApiError` if the identifier is malformed.
pub fn parse_tenant_id(raw: &str) -> Result<TenantId, ApiError> {
    Ok(TenantId::parse(raw)?)
}

/// Returns every tenant-scoped route, to be nested under the tenant prefix.
pub fn tenant_router() -> Router<AppState> {
    Router::new()
        .merge(events::router())
        .merge(runs::router())
        .merge(battle_state::router())
        .merge(members::router())
}

/// Returns the full application router without middleware.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/tenants/{tenant_id}", tenant_router())
        .nest("/api/v1/admin", admin::router())
}
