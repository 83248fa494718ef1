//! Command handlers for the Clan Battle context.
//!
//! Every handler resolves the tenant's handle, takes the tenant's update lock
//! for its whole read-modify-write span and releases it on every exit path by
//! dropping the guard. Locks of different tenants are independent.

use gauntlet_core::clock::Clock;
use gauntlet_core::command::Command;
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::EventDate;
use gauntlet_core::repository::{EventRecord, NewRun, Roster, TenantStore};
use gauntlet_core::tenant::{TenantHandle, TenantRouter};
use tracing::{error, info, warn};

use crate::domain::battle_state::BattleState;
use crate::domain::boss_table::{BossTable, BossTableHandle};
use crate::domain::commands::{
    CreateEvent, DeleteEvent, RebuildBattleState, ReloadBossTable, ResetBattleState,
    SetActiveEvent, SubmitRun,
};
use crate::domain::run::{RunOutcome, classify};

/// A battle state loaded for a transaction.
#[derive(Debug)]
pub(crate) struct LoadedState {
    pub(crate) state: BattleState,
    /// The state was rebuilt from the ledger and differs from what is
    /// persisted, so it must be written back.
    pub(crate) rebuilt: bool,
}

/// Loads the battle state of `event_date`, or rebuilds it from the event's
/// ledger when nothing is persisted, the persisted value tracks another
/// event, or it was computed against another boss table revision.
/// Callers must hold the tenant lock.
pub(crate) async fn load_or_replay(
    store: &dyn TenantStore,
    event_date: EventDate,
    table: &BossTable,
) -> Result<LoadedState, DomainError> {
    if let Some(stored) = store.get_battle_state().await? {
        let state = BattleState::from_stored(&stored)?;
        if state.is_current(event_date, table) {
            return Ok(LoadedState {
                state,
                rebuilt: false,
            });
        }
    }
    let runs = store.list_runs_for_event(&event_date).await?;
    Ok(LoadedState {
        state: BattleState::replay(event_date, &runs, table)?,
        rebuilt: true,
    })
}

fn log_fault<T>(command: &dyn Command, result: Result<T, DomainError>) -> Result<T, DomainError> {
    if let Err(err) = &result {
        if err.is_fault() {
            error!(
                command = command.command_type(),
                correlation_id = %command.correlation_id(),
                tenant_id = %command.tenant_id(),
                error = %err,
                "command failed"
            );
        } else {
            warn!(
                command = command.command_type(),
                correlation_id = %command.correlation_id(),
                tenant_id = %command.tenant_id(),
                error = %err,
                "command rejected"
            );
        }
    }
    result
}

/// Handles the `SubmitRun` command: validates the run, classifies it against
/// the current boss, advances the battle state on a kill and records the run.
///
/// A rejected overkill is still recorded as `lost` and returned as an
/// outcome with `accepted == false`; the battle state is left untouched.
///
/// # Errors
///
/// In order: `DomainError::NoActiveEvent`, `DomainError::InvalidDamage`,
/// `DomainError::NotAMember`, `DomainError::StaleRound`. Storage and boss
/// table faults are propagated. None of these record a run.
pub async fn handle_submit_run(
    command: &SubmitRun,
    clock: &dyn Clock,
    router: &TenantRouter,
    roster: &dyn Roster,
    boss_tables: &BossTableHandle,
) -> Result<RunOutcome, DomainError> {
    let result = submit_run(command, clock, router, roster, boss_tables).await;
    log_fault(command, result)
}

async fn submit_run(
    command: &SubmitRun,
    clock: &dyn Clock,
    router: &TenantRouter,
    roster: &dyn Roster,
    boss_tables: &BossTableHandle,
) -> Result<RunOutcome, DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    let _guard = handle.lock().await;
    let store = handle.store();
    let table = boss_tables.current()?;

    let event = store
        .active_event()
        .await?
        .ok_or(DomainError::NoActiveEvent)?;
    let damage = command.damage.validate()?.value();
    if !roster
        .member_exists(&command.tenant_id, &command.member_id)
        .await?
    {
        return Err(DomainError::NotAMember(command.member_id.clone()));
    }

    let LoadedState { mut state, rebuilt } = load_or_replay(store, event.date, &table).await?;
    if let Some(declared) = command.declared_round.filter(|round| *round != state.round) {
        return Err(DomainError::StaleRound {
            declared,
            current: state.round,
        });
    }

    let target = state.slot();
    let remaining_before = state.remaining_hp;
    let run_type = classify(command.finishing_blow, damage, remaining_before);
    let overkill = damage.saturating_sub(remaining_before);
    // A clock that steps backwards must not reorder the ledger.
    let read = clock.now();
    let now = match store.latest_run_at(&event.date).await? {
        Some(latest) if latest > read => latest,
        _ => read,
    };

    if run_type.is_accepted() {
        state.apply(run_type, damage, &table)?;
    }
    let stored_state = if run_type.is_accepted() || rebuilt {
        Some(state.to_stored(now)?)
    } else {
        None
    };

    let run = NewRun {
        event_date: event.date,
        round: target.round,
        boss: target.position,
        member_id: command.member_id.clone(),
        damage,
        run_type: run_type.as_str().to_owned(),
        boss_table: table.revision().to_owned(),
        recorded_at: now,
    };
    let run_id = store.commit_run(stored_state.as_ref(), &run).await?;

    if run_type.is_accepted() {
        info!(
            correlation_id = %command.correlation_id,
            tenant_id = %command.tenant_id,
            member_id = %command.member_id,
            run_id,
            %run_type,
            damage,
            round = state.round,
            boss = state.boss,
            remaining_hp = state.remaining_hp,
            "run accepted"
        );
        if overkill > 0 {
            warn!(
                correlation_id = %command.correlation_id,
                tenant_id = %command.tenant_id,
                overkill,
                "overkill discarded on finishing blow"
            );
        }
    } else {
        warn!(
            correlation_id = %command.correlation_id,
            tenant_id = %command.tenant_id,
            member_id = %command.member_id,
            run_id,
            damage,
            remaining_hp = remaining_before,
            "overkill rejected; run recorded as lost"
        );
    }

    Ok(RunOutcome {
        run_id,
        accepted: run_type.is_accepted(),
        damage,
        run_type,
        remaining_hp_after: state.remaining_hp,
        round: state.round,
        boss: state.boss,
        overkill,
    })
}

/// Handles the `CreateEvent` command: records a new event and, when
/// `activate` is set, makes it the active event.
///
/// # Errors
///
/// Returns `DomainError::DuplicateEvent` if the date already exists.
pub async fn handle_create_event(
    command: &CreateEvent,
    clock: &dyn Clock,
    router: &TenantRouter,
) -> Result<EventRecord, DomainError> {
    let result = create_event(command, clock, router).await;
    log_fault(command, result)
}

async fn create_event(
    command: &CreateEvent,
    clock: &dyn Clock,
    router: &TenantRouter,
) -> Result<EventRecord, DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    let _guard = handle.lock().await;
    let store = handle.store();

    if store.find_event(&command.date).await?.is_some() {
        return Err(DomainError::DuplicateEvent(command.date));
    }
    let event = EventRecord {
        date: command.date,
        name: command.name.clone().filter(|name| !name.is_empty()),
        created_at: clock.now(),
    };
    store.insert_event(&event).await?;
    info!(
        correlation_id = %command.correlation_id,
        tenant_id = %command.tenant_id,
        date = %event.date,
        "event created"
    );

    if command.activate {
        activate(store, command.date).await?;
        info!(
            correlation_id = %command.correlation_id,
            tenant_id = %command.tenant_id,
            date = %event.date,
            "active event updated"
        );
    }
    Ok(event)
}

/// Handles the `SetActiveEvent` command.
///
/// Switching to a different event discards the persisted battle state; the
/// next run rebuilds it from the newly active event's ledger.
///
/// # Errors
///
/// Returns `DomainError::UnknownEvent` if the date does not exist.
pub async fn handle_set_active_event(
    command: &SetActiveEvent,
    router: &TenantRouter,
) -> Result<EventRecord, DomainError> {
    let result = set_active_event(command, router).await;
    log_fault(command, result)
}

async fn set_active_event(
    command: &SetActiveEvent,
    router: &TenantRouter,
) -> Result<EventRecord, DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    let _guard = handle.lock().await;
    let store = handle.store();

    let event = store
        .find_event(&command.date)
        .await?
        .ok_or(DomainError::UnknownEvent(command.date))?;
    activate(store, command.date).await?;
    info!(
        correlation_id = %command.correlation_id,
        tenant_id = %command.tenant_id,
        date = %command.date,
        "active event updated"
    );
    Ok(event)
}

async fn activate(store: &dyn TenantStore, date: EventDate) -> Result<(), DomainError> {
    if let Some(stored) = store.get_battle_state().await? {
        if BattleState::from_stored(&stored)?.event_date != date {
            store.clear_battle_state().await?;
        }
    }
    store.set_active_event(&date).await
}

/// Handles the `DeleteEvent` command: removes the event and all of its runs.
/// Deleting the active event also clears the active pointer and the battle
/// state.
///
/// # Errors
///
/// Returns `DomainError::UnknownEvent` if the date does not exist.
pub async fn handle_delete_event(
    command: &DeleteEvent,
    router: &TenantRouter,
) -> Result<(), DomainError> {
    let result = delete_event(command, router).await;
    log_fault(command, result)
}

async fn delete_event(command: &DeleteEvent, router: &TenantRouter) -> Result<(), DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    let _guard = handle.lock().await;

    if !handle.store().delete_event(&command.date).await? {
        return Err(DomainError::UnknownEvent(command.date));
    }
    info!(
        correlation_id = %command.correlation_id,
        tenant_id = %command.tenant_id,
        date = %command.date,
        "event deleted"
    );
    Ok(())
}

/// Handles the `ResetBattleState` command.
///
/// # Errors
///
/// Returns `DomainError` if the store cannot be reached.
pub async fn handle_reset_battle_state(
    command: &ResetBattleState,
    router: &TenantRouter,
) -> Result<(), DomainError> {
    let result = reset_battle_state(command, router).await;
    log_fault(command, result)
}

async fn reset_battle_state(
    command: &ResetBattleState,
    router: &TenantRouter,
) -> Result<(), DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    let _guard = handle.lock().await;
    handle.store().clear_battle_state().await?;
    info!(
        correlation_id = %command.correlation_id,
        tenant_id = %command.tenant_id,
        "battle state reset"
    );
    Ok(())
}

/// Handles the `RebuildBattleState` command: replays the active event's
/// ledger from an empty start and persists the result.
///
/// # Errors
///
/// Returns `DomainError::NoActiveEvent` if no event is active, and
/// `DomainError::Infrastructure` if the ledger cannot be replayed.
pub async fn handle_rebuild_battle_state(
    command: &RebuildBattleState,
    clock: &dyn Clock,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<BattleState, DomainError> {
    let result = rebuild_battle_state(command, clock, router, boss_tables).await;
    log_fault(command, result)
}

async fn rebuild_battle_state(
    command: &RebuildBattleState,
    clock: &dyn Clock,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<BattleState, DomainError> {
    let handle = router.handle_for(&command.tenant_id).await?;
    let _guard = handle.lock().await;
    let store = handle.store();
    let table = boss_tables.current()?;

    let event = store
        .active_event()
        .await?
        .ok_or(DomainError::NoActiveEvent)?;
    let runs = store.list_runs_for_event(&event.date).await?;
    let state = BattleState::replay(event.date, &runs, &table)?;
    store.put_battle_state(&state.to_stored(clock.now())?).await?;
    info!(
        correlation_id = %command.correlation_id,
        tenant_id = %command.tenant_id,
        runs = runs.len(),
        round = state.round,
        boss = state.boss,
        "battle state rebuilt from ledger"
    );
    Ok(state)
}

/// What a boss table reload changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossTableReload {
    /// Revision of the table now live.
    pub revision: String,
    /// Open tenants whose battle state was rebuilt against the new table.
    pub tenants_rebuilt: usize,
}

/// Handles the `ReloadBossTable` command: swaps in a new boss table and
/// rebuilds the battle state of every open tenant's active event against it.
///
/// The update locks of all open tenants are held, in tenant order, from the
/// compatibility check until the rebuilt states are written, so no run is
/// classified against a table that is about to change. Tenants opened later
/// are rebuilt by their next transaction.
///
/// # Errors
///
/// Returns `DomainError::Config` and keeps the previous table if an open
/// tenant's ledger cannot be replayed under the new table.
pub async fn handle_reload_boss_table(
    command: ReloadBossTable,
    clock: &dyn Clock,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<BossTableReload, DomainError> {
    let correlation_id = command.correlation_id;
    let result = reload_boss_table(command, clock, router, boss_tables).await;
    if let Err(err) = &result {
        error!(
            command = "battle.reload_boss_table",
            correlation_id = %correlation_id,
            error = %err,
            "boss table reload refused"
        );
    }
    result
}

async fn reload_boss_table(
    command: ReloadBossTable,
    clock: &dyn Clock,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<BossTableReload, DomainError> {
    let table = command.table;
    let mut handles = router.open_handles()?;
    handles.sort_by(|a, b| a.tenant_id().cmp(b.tenant_id()));

    let mut guards = Vec::with_capacity(handles.len());
    for handle in &handles {
        guards.push(handle.lock().await);
    }

    let mut rebuilt = Vec::new();
    for handle in &handles {
        if let Some(state) = rebuild_for(handle, &table).await? {
            rebuilt.push((handle, state));
        }
    }

    let revision = table.revision().to_owned();
    boss_tables.swap(table)?;

    let now = clock.now();
    let mut tenants_rebuilt = 0;
    for (handle, state) in rebuilt {
        // A failed write leaves the old revision persisted; the tenant's next
        // transaction rebuilds it.
        match handle.store().put_battle_state(&state.to_stored(now)?).await {
            Ok(()) => tenants_rebuilt += 1,
            Err(err) => error!(
                correlation_id = %command.correlation_id,
                tenant_id = %handle.tenant_id(),
                error = %err,
                "failed to persist rebuilt battle state"
            ),
        }
    }
    drop(guards);

    info!(
        correlation_id = %command.correlation_id,
        revision = %revision,
        tenants_rebuilt,
        "boss table reloaded"
    );
    Ok(BossTableReload {
        revision,
        tenants_rebuilt,
    })
}

/// Replays a tenant's active event under `table`. `None` when no event is
/// active or the persisted state is already current. Caller holds the lock.
async fn rebuild_for(
    handle: &TenantHandle,
    table: &BossTable,
) -> Result<Option<BattleState>, DomainError> {
    let store = handle.store();
    let Some(event) = store.active_event().await? else {
        return Ok(None);
    };
    let loaded = load_or_replay(store, event.date, table)
        .await
        .map_err(|err| match err {
            DomainError::Config(msg) => {
                DomainError::Config(format!("tenant {}: {msg}", handle.tenant_id()))
            }
            other => other,
        })?;
    Ok(loaded.rebuilt.then_some(loaded.state))
}
