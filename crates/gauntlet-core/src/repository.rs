//! Per-tenant storage abstraction.
//!
//! A [`TenantStore`] is one isolated storage unit holding everything a tenant
//! owns: its events, the active-event pointer, the battle state, the run
//! ledger and the roster. Implementations must make every single method call
//! atomic; [`TenantStore::commit_run`] and [`TenantStore::delete_event`] span
//! several tables and must commit or roll back as one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::ids::{EventDate, MemberId, TenantId};

/// Ledger-assigned identifier of a run record. Strictly increasing in
/// insertion order within one tenant.
pub type RunId = i64;

/// Stored representation of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// The event's calendar date (unique per tenant).
    pub date: EventDate,
    /// Optional display name.
    pub name: Option<String>,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

/// A run record about to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRun {
    /// The event the run was submitted against.
    pub event_date: EventDate,
    /// Round the targeted boss belongs to.
    pub round: u32,
    /// Position of the targeted boss within its round (1-based).
    pub boss: u32,
    /// The submitting member.
    pub member_id: MemberId,
    /// Submitted damage.
    pub damage: u64,
    /// Classification name, e.g. `"full"` or `"last"`.
    pub run_type: String,
    /// Revision of the boss table the run was classified against.
    pub boss_table: String,
    /// Submission time. Never earlier than the previous run of the same
    /// event, so timestamp order matches insertion order.
    pub recorded_at: DateTime<Utc>,
}

/// A run record as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRun {
    /// Ledger identifier.
    pub run_id: RunId,
    /// The event the run was submitted against.
    pub event_date: EventDate,
    /// Round the targeted boss belongs to.
    pub round: u32,
    /// Position of the targeted boss within its round (1-based).
    pub boss: u32,
    /// The submitting member.
    pub member_id: MemberId,
    /// Submitted damage.
    pub damage: u64,
    /// Classification name.
    pub run_type: String,
    /// Revision of the boss table the run was classified against. Empty for
    /// runs recorded before revisions were tracked.
    pub boss_table: String,
    /// Submission time.
    pub recorded_at: DateTime<Utc>,
}

/// Stored representation of a tenant's battle state: one versioned value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBattleState {
    /// Number of accepted runs folded into this state.
    pub version: i64,
    /// Serialized battle state.
    pub payload: serde_json::Value,
    /// When the value was last written.
    pub updated_at: DateTime<Utc>,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    /// Member identifier.
    pub member_id: MemberId,
    /// Account name.
    pub name: String,
    /// Optional display nickname.
    pub nick: Option<String>,
}

impl MemberRecord {
    /// The name to show for this member: nickname if set, account name otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.nick.as_deref() {
            Some(nick) if !nick.is_empty() => nick,
            _ => &self.name,
        }
    }
}

/// Storage for a single tenant.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Inserts a new event.
    ///
    /// Fails with `DomainError::DuplicateEvent` if the date already exists.
    async fn insert_event(&self, event: &EventRecord) -> Result<(), DomainError>;

    /// Looks up an event by date.
    async fn find_event(&self, date: &EventDate) -> Result<Option<EventRecord>, DomainError>;

    /// Lists all events ordered by date.
    async fn list_events(&self) -> Result<Vec<EventRecord>, DomainError>;

    /// Deletes an event and every run recorded against it. If it was the
    /// active event, also clears the active pointer and the battle state.
    /// Returns `false` if no such event existed.
    async fn delete_event(&self, date: &EventDate) -> Result<bool, DomainError>;

    /// Returns the active event, if any.
    async fn active_event(&self) -> Result<Option<EventRecord>, DomainError>;

    /// Points the active-event pointer at an existing event.
    async fn set_active_event(&self, date: &EventDate) -> Result<(), DomainError>;

    /// Returns the persisted battle state, if any.
    async fn get_battle_state(&self) -> Result<Option<StoredBattleState>, DomainError>;

    /// Replaces the battle state.
    async fn put_battle_state(&self, state: &StoredBattleState) -> Result<(), DomainError>;

    /// Removes the battle state.
    async fn clear_battle_state(&self) -> Result<(), DomainError>;

    /// Appends a run to the ledger and returns its identifier.
    async fn append_run(&self, run: &NewRun) -> Result<RunId, DomainError>;

    /// Lists the runs of one event ordered by `recorded_at`, ties broken by
    /// insertion order.
    async fn list_runs_for_event(&self, date: &EventDate) -> Result<Vec<StoredRun>, DomainError>;

    /// Latest `recorded_at` among the runs of one event, if it has any.
    async fn latest_run_at(&self, date: &EventDate) -> Result<Option<DateTime<Utc>>, DomainError>;

    /// Deletes every run of one event and returns how many were removed.
    async fn delete_runs_for_event(&self, date: &EventDate) -> Result<u64, DomainError>;

    /// Appends a run and, when `state` is given, replaces the battle state,
    /// atomically.
    async fn commit_run(
        &self,
        state: Option<&StoredBattleState>,
        run: &NewRun,
    ) -> Result<RunId, DomainError>;

    /// Adds a member to the roster. Returns `false` if already present.
    async fn add_member(&self, member: &MemberRecord) -> Result<bool, DomainError>;

    /// Removes a member from the roster. Returns `false` if absent.
    async fn remove_member(&self, member_id: &MemberId) -> Result<bool, DomainError>;

    /// Returns whether the member is on the roster.
    async fn member_exists(&self, member_id: &MemberId) -> Result<bool, DomainError>;

    /// Lists the roster.
    async fn list_members(&self) -> Result<Vec<MemberRecord>, DomainError>;

    /// Releases the underlying storage. Called once at shutdown.
    async fn close(&self);
}

/// Roster membership check consumed by the run submission path.
#[async_trait]
pub trait Roster: Send + Sync {
    /// Returns whether `member_id` belongs to `tenant_id`'s roster.
    async fn member_exists(
        &self,
        tenant_id: &TenantId,
        member_id: &MemberId,
    ) -> Result<bool, DomainError>;
}
