//! In-memory tenant stores for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::{EventDate, MemberId, TenantId};
use gauntlet_core::repository::{
    EventRecord, MemberRecord, NewRun, RunId, StoredBattleState, StoredRun, TenantStore,
};
use gauntlet_core::tenant::StoreOpener;

#[derive(Debug, Default)]
struct Inner {
    events: BTreeMap<EventDate, EventRecord>,
    active: Option<EventDate>,
    battle_state: Option<StoredBattleState>,
    runs: Vec<StoredRun>,
    last_run_id: RunId,
    members: BTreeMap<MemberId, MemberRecord>,
}

impl Inner {
    fn push_run(&mut self, run: &NewRun) -> RunId {
        self.last_run_id += 1;
        self.runs.push(StoredRun {
            run_id: self.last_run_id,
            event_date: run.event_date,
            round: run.round,
            boss: run.boss,
            member_id: run.member_id.clone(),
            damage: run.damage,
            run_type: run.run_type.clone(),
            boss_table: run.boss_table.clone(),
            recorded_at: run.recorded_at,
        });
        self.last_run_id
    }
}

/// A `TenantStore` kept entirely in memory. Every call holds one mutex, so
/// each call is atomic. Supports injecting a single commit failure.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    inner: Mutex<Inner>,
    fail_next_commit: AtomicBool,
    closed: AtomicBool,
}

impl InMemoryTenantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `commit_run` fail with an infrastructure error without
    /// writing anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Total number of runs in the ledger, across events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn run_count(&self) -> usize {
        self.inner.lock().unwrap().runs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn insert_event(&self, event: &EventRecord) -> Result<(), DomainError> {
        let mut inner = self.lock();
        if inner.events.contains_key(&event.date) {
            return Err(DomainError::DuplicateEvent(event.date));
        }
        inner.events.insert(event.date, event.clone());
        Ok(())
    }

    async fn find_event(&self, date: &EventDate) -> Result<Option<EventRecord>, DomainError> {
        Ok(self.lock().events.get(date).cloned())
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>, DomainError> {
        Ok(self.lock().events.values().cloned().collect())
    }

    async fn delete_event(&self, date: &EventDate) -> Result<bool, DomainError> {
        let mut inner = self.lock();
        if inner.events.remove(date).is_none() {
            return Ok(false);
        }
        inner.runs.retain(|run| run.event_date != *date);
        if inner.active == Some(*date) {
            inner.active = None;
            inner.battle_state = None;
        }
        Ok(true)
    }

    async fn active_event(&self) -> Result<Option<EventRecord>, DomainError> {
        let inner = self.lock();
        Ok(inner
            .active
            .and_then(|date| inner.events.get(&date).cloned()))
    }

    async fn set_active_event(&self, date: &EventDate) -> Result<(), DomainError> {
        let mut inner = self.lock();
        if !inner.events.contains_key(date) {
            return Err(DomainError::UnknownEvent(*date));
        }
        inner.active = Some(*date);
        Ok(())
    }

    async fn get_battle_state(&self) -> Result<Option<StoredBattleState>, DomainError> {
        Ok(self.lock().battle_state.clone())
    }

    async fn put_battle_state(&self, state: &StoredBattleState) -> Result<(), DomainError> {
        self.lock().battle_state = Some(state.clone());
        Ok(())
    }

    async fn clear_battle_state(&self) -> Result<(), DomainError> {
        self.lock().battle_state = None;
        Ok(())
    }

    async fn append_run(&self, run: &NewRun) -> Result<RunId, DomainError> {
        Ok(self.lock().push_run(run))
    }

    async fn list_runs_for_event(&self, date: &EventDate) -> Result<Vec<StoredRun>, DomainError> {
        let mut runs: Vec<StoredRun> = self
            .lock()
            .runs
            .iter()
            .filter(|run| run.event_date == *date)
            .cloned()
            .collect();
        runs.sort_by_key(|run| (run.recorded_at, run.run_id));
        Ok(runs)
    }

    async fn latest_run_at(&self, date: &EventDate) -> Result<Option<DateTime<Utc>>, DomainError> {
        Ok(self
            .lock()
            .runs
            .iter()
            .filter(|run| run.event_date == *date)
            .map(|run| run.recorded_at)
            .max())
    }

    async fn delete_runs_for_event(&self, date: &EventDate) -> Result<u64, DomainError> {
        let mut inner = self.lock();
        let before = inner.runs.len();
        inner.runs.retain(|run| run.event_date != *date);
        Ok((before - inner.runs.len()) as u64)
    }

    async fn commit_run(
        &self,
        state: Option<&StoredBattleState>,
        run: &NewRun,
    ) -> Result<RunId, DomainError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("injected commit failure".into()));
        }
        let mut inner = self.lock();
        if let Some(state) = state {
            inner.battle_state = Some(state.clone());
        }
        Ok(inner.push_run(run))
    }

    async fn add_member(&self, member: &MemberRecord) -> Result<bool, DomainError> {
        let mut inner = self.lock();
        if inner.members.contains_key(&member.member_id) {
            return Ok(false);
        }
        inner
            .members
            .insert(member.member_id.clone(), member.clone());
        Ok(true)
    }

    async fn remove_member(&self, member_id: &MemberId) -> Result<bool, DomainError> {
        Ok(self.lock().members.remove(member_id).is_some())
    }

    async fn member_exists(&self, member_id: &MemberId) -> Result<bool, DomainError> {
        Ok(self.lock().members.contains_key(member_id))
    }

    async fn list_members(&self) -> Result<Vec<MemberRecord>, DomainError> {
        Ok(self.lock().members.values().cloned().collect())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Opens a fresh `InMemoryTenantStore` per call and keeps every store it
/// opened so tests can inspect them. An optional delay widens the window in
/// which concurrent first-time opens could race.
#[derive(Debug, Default)]
pub struct InMemoryStoreOpener {
    opened: Mutex<Vec<(TenantId, Arc<InMemoryTenantStore>)>>,
    open_calls: AtomicUsize,
    open_delay: Option<Duration>,
}

impl InMemoryStoreOpener {
    /// Creates an opener with no delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an opener that sleeps for `delay` inside every open.
    #[must_use]
    pub fn with_open_delay(delay: Duration) -> Self {
        Self {
            open_delay: Some(delay),
            ..Self::default()
        }
    }

    /// How many times `open` has been called.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// The most recently opened store for `tenant_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn store_for(&self, tenant_id: &TenantId) -> Option<Arc<InMemoryTenantStore>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == tenant_id)
            .map(|(_, store)| Arc::clone(store))
    }
}

#[async_trait]
impl StoreOpener for InMemoryStoreOpener {
    async fn open(&self, tenant_id: &TenantId) -> Result<Arc<dyn TenantStore>, DomainError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        let store = Arc::new(InMemoryTenantStore::new());
        self.opened
            .lock()
            .unwrap()
            .push((tenant_id.clone(), Arc::clone(&store)));
        Ok(store)
    }
}
