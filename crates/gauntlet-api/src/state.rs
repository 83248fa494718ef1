//! Shared application state.

use std::sync::Arc;

use gauntlet_battle::domain::boss_table::BossTableHandle;
use gauntlet_core::clock::Clock;
use gauntlet_core::repository::Roster;
use gauntlet_core::tenant::TenantRouter;

use crate::config::BossTableSource;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used to timestamp events and runs.
    pub clock: Arc<dyn Clock>,
    /// Per-tenant store handles.
    pub tenants: Arc<TenantRouter>,
    /// Membership check used on run submission.
    pub roster: Arc<dyn Roster>,
    /// The live boss table.
    pub boss_tables: BossTableHandle,
    /// Where the boss table is reloaded from; `None` disables reloading.
    pub boss_table_source: Option<BossTableSource>,
}

impl AppState {
    /// Create new application state. Membership is answered from each
    /// tenant's own roster.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        tenants: Arc<TenantRouter>,
        boss_tables: BossTableHandle,
        boss_table_source: Option<BossTableSource>,
    ) -> Self {
        let roster: Arc<dyn Roster> = tenants.clone();
        Self {
            clock,
            tenants,
            roster,
            boss_tables,
            boss_table_source,
        }
    }

    /// Replaces the membership check.
    #[must_use]
    pub fn with_roster(mut self, roster: Arc<dyn Roster>) -> Self {
        self.roster = roster;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tenants", &self.tenants)
            .field("boss_table_source", &self.boss_table_source)
            .finish_non_exhaustive()
    }
}
