//! Commands for the Clan Battle context.

use gauntlet_core::command::Command;
use gauntlet_core::ids::{EventDate, MemberId, TenantId};
use uuid::Uuid;

use super::boss_table::BossTable;
use super::run::RawDamage;

/// Command to submit a run against the current boss.
#[derive(Debug, Clone)]
pub struct SubmitRun {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The submitting tenant.
    pub tenant_id: TenantId,
    /// The submitting member.
    pub member_id: MemberId,
    /// The round the member believes is current, if they stated one.
    pub declared_round: Option<u32>,
    /// Damage as submitted; validated by the handler after the active
    /// event check.
    pub damage: RawDamage,
    /// The member declared this run as a finishing blow.
    pub finishing_blow: bool,
}

impl Command for SubmitRun {
    fn command_type(&self) -> &'static str {
        "battle.submit_run"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Command to create an event, optionally making it active (starting it).
#[derive(Debug, Clone)]
pub struct CreateEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The event date.
    pub date: EventDate,
    /// Optional display name.
    pub name: Option<String>,
    /// Also point the active event at the new event.
    pub activate: bool,
}

impl Command for CreateEvent {
    fn command_type(&self) -> &'static str {
        if self.activate {
            "battle.start_event"
        } else {
            "battle.create_event"
        }
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Command to make an existing event the active one.
#[derive(Debug, Clone)]
pub struct SetActiveEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The event to activate.
    pub date: EventDate,
}

impl Command for SetActiveEvent {
    fn command_type(&self) -> &'static str {
        "battle.set_active_event"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Command to delete an event and its runs.
#[derive(Debug, Clone)]
pub struct DeleteEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The event to delete.
    pub date: EventDate,
}

impl Command for DeleteEvent {
    fn command_type(&self) -> &'static str {
        "battle.delete_event"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Administrative command to discard the persisted battle state. The next
/// run rebuilds it from the active event's ledger.
#[derive(Debug, Clone)]
pub struct ResetBattleState {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
}

impl Command for ResetBattleState {
    fn command_type(&self) -> &'static str {
        "battle.reset_battle_state"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Administrative command to replay the active event's ledger and persist
/// the result.
#[derive(Debug, Clone)]
pub struct RebuildBattleState {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
}

impl Command for RebuildBattleState {
    fn command_type(&self) -> &'static str {
        "battle.rebuild_battle_state"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Command to add a member to the roster.
#[derive(Debug, Clone)]
pub struct JoinRoster {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The joining member.
    pub member_id: MemberId,
    /// Account name.
    pub name: String,
    /// Optional display nickname.
    pub nick: Option<String>,
}

impl Command for JoinRoster {
    fn command_type(&self) -> &'static str {
        "battle.join_roster"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Command to remove a member from the roster.
#[derive(Debug, Clone)]
pub struct LeaveRoster {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The leaving member.
    pub member_id: MemberId,
}

impl Command for LeaveRoster {
    fn command_type(&self) -> &'static str {
        "battle.leave_roster"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Command to replace the live boss table. Not scoped to a tenant: every
/// open tenant is brought onto the new table.
#[derive(Debug, Clone)]
pub struct ReloadBossTable {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The validated replacement table.
    pub table: BossTable,
}
