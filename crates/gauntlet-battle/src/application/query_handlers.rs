//! Query handlers for the Clan Battle context.
//!
//! Queries do not take the tenant's update lock. Each store call is atomic,
//! so a reader sees either the state before or after a concurrent write,
//! never a partial one.

use chrono::{DateTime, Utc};
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::{EventDate, MemberId, TenantId};
use gauntlet_core::repository::{EventRecord, MemberRecord, TenantStore};
use gauntlet_core::tenant::TenantRouter;
use serde::Serialize;

use crate::domain::battle_state::BattleState;
use crate::domain::boss_table::{BossTable, BossTableHandle, Tier};
use crate::domain::run::RunView;

/// Read-only view of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    /// The event date.
    pub date: EventDate,
    /// Optional display name.
    pub name: Option<String>,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl From<EventRecord> for EventView {
    fn from(event: EventRecord) -> Self {
        Self {
            date: event.date,
            name: event.name,
            created_at: event.created_at,
        }
    }
}

/// Read-only view of the battle state, enriched from the boss table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleStateView {
    /// The event being tracked.
    pub event_date: EventDate,
    /// Current round.
    pub round: u32,
    /// Current boss position.
    pub boss: u32,
    /// Tier of the current round.
    pub tier: Tier,
    /// Remaining hit points of the current boss.
    pub remaining_hp: u64,
    /// Full pool of the current boss.
    pub max_hp: u64,
    /// Number of accepted runs applied.
    pub version: i64,
}

/// Read-only view of a roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    /// Member identifier.
    pub member_id: MemberId,
    /// Nickname, or account name when no nickname is set.
    pub display_name: String,
}

impl From<&MemberRecord> for MemberView {
    fn from(member: &MemberRecord) -> Self {
        Self {
            member_id: member.member_id.clone(),
            display_name: member.display_name().to_owned(),
        }
    }
}

/// Returns the tenant's active event, if any.
///
/// # Errors
///
/// Returns `DomainError` if the store cannot be reached.
pub async fn get_active_event(
    tenant_id: &TenantId,
    router: &TenantRouter,
) -> Result<Option<EventView>, DomainError> {
    let handle = router.handle_for(tenant_id).await?;
    Ok(handle.store().active_event().await?.map(EventView::from))
}

/// Lists the tenant's events ordered by date.
///
/// # Errors
///
/// Returns `DomainError` if the store cannot be reached.
pub async fn list_events(
    tenant_id: &TenantId,
    router: &TenantRouter,
) -> Result<Vec<EventView>, DomainError> {
    let handle = router.handle_for(tenant_id).await?;
    let events = handle.store().list_events().await?;
    Ok(events.into_iter().map(EventView::from).collect())
}

/// Returns the battle state of the active event.
///
/// `None` when no event is active or no state is persisted for it. A state
/// persisted against another boss table revision is returned replayed under
/// the current table; the tenant's next transaction persists the rebuild.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the stored value is malformed,
/// and `DomainError::Config` if the ledger does not fit the current table.
pub async fn get_battle_state(
    tenant_id: &TenantId,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<Option<BattleState>, DomainError> {
    let table = boss_tables.current()?;
    let handle = router.handle_for(tenant_id).await?;
    let store = handle.store();
    let Some(active) = store.active_event().await? else {
        return Ok(None);
    };
    let Some(stored) = store.get_battle_state().await? else {
        return Ok(None);
    };
    let state = BattleState::from_stored(&stored)?;
    if state.event_date != active.date {
        return Ok(None);
    }
    if state.is_current(active.date, &table) {
        return Ok(Some(state));
    }
    replay_with(store, active.date, &table).await.map(Some)
}

/// Describes the active event's progress for display. Unlike
/// [`get_battle_state`], an active event with no persisted state is shown at
/// its replayed position. One boss table snapshot serves the whole view.
///
/// # Errors
///
/// Returns `DomainError::NoActiveEvent` if no event is active, and
/// `DomainError::Config` if the boss table lacks the current boss.
pub async fn describe_battle_state(
    tenant_id: &TenantId,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<BattleStateView, DomainError> {
    let table = boss_tables.current()?;
    let handle = router.handle_for(tenant_id).await?;
    let store = handle.store();
    let active = store
        .active_event()
        .await?
        .ok_or(DomainError::NoActiveEvent)?;
    let persisted = match store.get_battle_state().await? {
        Some(stored) => Some(BattleState::from_stored(&stored)?),
        None => None,
    };
    let state = match persisted {
        Some(state) if state.is_current(active.date, &table) => state,
        _ => replay_with(store, active.date, &table).await?,
    };

    let tier = table.tier_for(state.round)?;
    Ok(BattleStateView {
        event_date: state.event_date,
        round: state.round,
        boss: state.boss,
        tier,
        remaining_hp: state.remaining_hp,
        max_hp: table.pool_for(tier, state.round, state.boss)?,
        version: state.version,
    })
}

async fn replay_with(
    store: &dyn TenantStore,
    date: EventDate,
    table: &BossTable,
) -> Result<BattleState, DomainError> {
    let runs = store.list_runs_for_event(&date).await?;
    BattleState::replay(date, &runs, table)
}

/// Lists the runs recorded against an event in submission order.
///
/// # Errors
///
/// Returns `DomainError::UnknownEvent` if the event does not exist.
pub async fn list_runs(
    tenant_id: &TenantId,
    date: EventDate,
    router: &TenantRouter,
) -> Result<Vec<RunView>, DomainError> {
    let handle = router.handle_for(tenant_id).await?;
    let store = handle.store();
    if store.find_event(&date).await?.is_none() {
        return Err(DomainError::UnknownEvent(date));
    }
    let runs = store.list_runs_for_event(&date).await?;
    Ok(runs.iter().map(RunView::from).collect())
}

/// Rebuilds an event's battle state from its ledger without persisting it.
///
/// # Errors
///
/// Returns `DomainError::UnknownEvent` if the event does not exist and
/// `DomainError::Infrastructure` if the ledger is inconsistent.
pub async fn replay_battle_state(
    tenant_id: &TenantId,
    date: EventDate,
    router: &TenantRouter,
    boss_tables: &BossTableHandle,
) -> Result<BattleState, DomainError> {
    let handle = router.handle_for(tenant_id).await?;
    let store = handle.store();
    if store.find_event(&date).await?.is_none() {
        return Err(DomainError::UnknownEvent(date));
    }
    replay_with(store, date, &*boss_tables.current()?).await
}

/// Lists the tenant's roster.
///
/// # Errors
///
/// Returns `DomainError` if the store cannot be reached.
pub async fn list_members(
    tenant_id: &TenantId,
    router: &TenantRouter,
) -> Result<Vec<MemberView>, DomainError> {
    let handle = router.handle_for(tenant_id).await?;
    let members = handle.store().list_members().await?;
    Ok(members.iter().map(MemberView::from).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use gauntlet_core::error::DomainError;
    use gauntlet_core::ids::{EventDate, MemberId, TenantId};
    use gauntlet_core::tenant::TenantRouter;
    use gauntlet_test_support::{
        InMemoryStoreOpener, SAMPLE_BOSS_DATA, StaticRoster, SteppingClock,
    };
    use uuid::Uuid;

    use super::*;
    use crate::application::command_handlers::{handle_create_event, handle_submit_run};
    use crate::domain::boss_table::BossTable;
    use crate::domain::commands::{CreateEvent, SubmitRun};
    use crate::domain::run::RunType;

    fn router() -> TenantRouter {
        TenantRouter::new(Arc::new(InMemoryStoreOpener::new()))
    }

    fn tables() -> BossTableHandle {
        BossTableHandle::new(BossTable::from_yaml_str(SAMPLE_BOSS_DATA, "pcr_jp").unwrap())
    }

    fn clock() -> SteppingClock {
        SteppingClock::new(
            Utc.with_ymd_and_hms(2026, 3, 25, 5, 0, 0).unwrap(),
            Duration::seconds(1),
        )
    }

    async fn start_event(router: &TenantRouter, clock: &SteppingClock, tenant_id: &TenantId, date: &str) {
        let command = CreateEvent {
            correlation_id: Uuid::new_v4(),
            tenant_id: tenant_id.clone(),
            date: EventDate::parse(date).unwrap(),
            name: None,
            activate: true,
        };
        handle_create_event(&command, clock, router).await.unwrap();
    }

    async fn submit(
        router: &TenantRouter,
        clock: &SteppingClock,
        tables: &BossTableHandle,
        tenant_id: &TenantId,
        damage: i64,
        finishing_blow: bool,
    ) -> RunType {
        let command = SubmitRun {
            correlation_id: Uuid::new_v4(),
            tenant_id: tenant_id.clone(),
            member_id: MemberId::new("1001"),
            declared_round: None,
            damage: damage.into(),
            finishing_blow,
        };
        let roster = StaticRoster::new(["1001"]);
        handle_submit_run(&command, clock, router, &roster, tables)
            .await
            .unwrap()
            .run_type
    }

    #[tokio::test]
    async fn test_replay_reproduces_persisted_state() {
        // Arrange
        let router = router();
        let clock = clock();
        let tables = tables();
        let tenant_id = TenantId::parse("guild-1").unwrap();
        start_event(&router, &clock, &tenant_id, "2026-03-25").await;
        let script: [(i64, bool); 8] = [
            (2_000_000, false),
            (9_000_000, false),
            (4_000_000, false),
            (7_999_999, true),
            (30_000_000, true),
            (123, false),
            (20_000_000, false),
            (11_000_000, true),
        ];
        for (damage, flag) in script {
            submit(&router, &clock, &tables, &tenant_id, damage, flag).await;
        }

        // Act
        let date = EventDate::parse("2026-03-25").unwrap();
        let replayed = replay_battle_state(&tenant_id, date, &router, &tables)
            .await
            .unwrap();

        // Assert
        let persisted = get_battle_state(&tenant_id, &router, &tables).await.unwrap().unwrap();
        assert_eq!(replayed, persisted);
        assert_eq!((persisted.round, persisted.boss), (1, 4));
    }

    #[tokio::test]
    async fn test_list_runs_preserves_submission_order() {
        // Arrange
        let router = router();
        let clock = clock();
        let tables = tables();
        let tenant_id = TenantId::parse("guild-1").unwrap();
        start_event(&router, &clock, &tenant_id, "2026-03-25").await;
        submit(&router, &clock, &tables, &tenant_id, 100, false).await;
        submit(&router, &clock, &tables, &tenant_id, 99_000_000, false).await;
        submit(&router, &clock, &tables, &tenant_id, 99_000_000, true).await;

        // Act
        let runs = list_runs(
            &tenant_id,
            EventDate::parse("2026-03-25").unwrap(),
            &router,
        )
        .await
        .unwrap();

        // Assert
        let types: Vec<RunType> = runs.iter().map(|run| run.run_type).collect();
        assert_eq!(types, [RunType::Full, RunType::Lost, RunType::Last]);
        assert!(runs.windows(2).all(|pair| pair[0].run_id < pair[1].run_id));
        assert!(runs.iter().all(|run| (run.round, run.boss) == (1, 1)));
    }

    #[tokio::test]
    async fn test_list_runs_for_unknown_event_fails() {
        let router = router();
        let tenant_id = TenantId::parse("guild-1").unwrap();
        let missing = EventDate::parse("2026-01-01").unwrap();

        let result = list_runs(&tenant_id, missing, &router).await;

        assert!(matches!(result, Err(DomainError::UnknownEvent(d)) if d == missing));
    }

    #[tokio::test]
    async fn test_describe_battle_state_before_any_run_shows_full_first_boss() {
        // Arrange
        let router = router();
        let clock = clock();
        let tables = tables();
        let tenant_id = TenantId::parse("guild-1").unwrap();
        start_event(&router, &clock, &tenant_id, "2026-03-25").await;

        // Act
        let view = describe_battle_state(&tenant_id, &router, &tables)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.tier, Tier::A);
        assert_eq!((view.round, view.boss), (1, 1));
        assert_eq!(view.remaining_hp, 6_000_000);
        assert_eq!(view.max_hp, 6_000_000);
        assert!(get_battle_state(&tenant_id, &router, &tables).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_after_table_swap_use_the_new_table() {
        // Arrange: 1M into the 6M first boss, then the table shrinks to 2M.
        let router = router();
        let clock = clock();
        let tables = tables();
        let tenant_id = TenantId::parse("guild-1").unwrap();
        start_event(&router, &clock, &tenant_id, "2026-03-25").await;
        submit(&router, &clock, &tables, &tenant_id, 1_000_000, false).await;
        let smaller =
            BossTable::new(std::collections::HashMap::from([(Tier::A, vec![2_000_000, 2_000_000])]))
                .unwrap();
        tables.swap(smaller).unwrap();

        // Act
        let view = describe_battle_state(&tenant_id, &router, &tables)
            .await
            .unwrap();
        let state = get_battle_state(&tenant_id, &router, &tables)
            .await
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(view.remaining_hp, 1_000_000);
        assert_eq!(view.max_hp, 2_000_000);
        assert_eq!(state.remaining_hp, 1_000_000);
        assert_eq!(state.boss_table, tables.current().unwrap().revision());
    }

    #[tokio::test]
    async fn test_describe_battle_state_without_active_event_fails() {
        let router = router();
        let tenant_id = TenantId::parse("guild-1").unwrap();

        let result = describe_battle_state(&tenant_id, &router, &tables()).await;

        assert!(matches!(result, Err(DomainError::NoActiveEvent)));
    }

    #[tokio::test]
    async fn test_list_events_is_ordered_by_date() {
        // Arrange
        let router = router();
        let clock = clock();
        let tenant_id = TenantId::parse("guild-1").unwrap();
        start_event(&router, &clock, &tenant_id, "2026-05-25").await;
        start_event(&router, &clock, &tenant_id, "2026-03-25").await;

        // Act
        let events = list_events(&tenant_id, &router).await.unwrap();

        // Assert
        let dates: Vec<String> = events.iter().map(|e| e.date.to_string()).collect();
        assert_eq!(dates, ["2026-03-25", "2026-05-25"]);
        let active = get_active_event(&tenant_id, &router).await.unwrap().unwrap();
        assert_eq!(active.date.to_string(), "2026-03-25");
    }
}
