//! SQLite implementation of the `TenantStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::debug;

use gauntlet_core::error::DomainError;
use gauntlet_core::ids::{EventDate, MemberId};
use gauntlet_core::repository::{
    EventRecord, MemberRecord, NewRun, RunId, StoredBattleState, StoredRun, TenantStore,
};

use crate::schema::CREATE_TENANT_SCHEMA;

/// SQLite-backed store holding one tenant's data.
#[derive(Debug, Clone)]
pub struct SqliteTenantStore {
    pool: SqlitePool,
}

impl SqliteTenantStore {
    /// Wraps a pool connected to a tenant database.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the tenant tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the schema cannot be applied.
    pub async fn bootstrap(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_TENANT_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(infra("apply schema"))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DomainError> {
        self.pool.begin().await.map_err(infra("begin transaction"))
    }
}

fn infra(action: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::Infrastructure(format!("failed to {action}: {e}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| DomainError::Infrastructure(format!("stored timestamp out of range: {micros}")))
}

fn stored_date(raw: &str) -> Result<EventDate, DomainError> {
    EventDate::parse(raw)
        .map_err(|_| DomainError::Infrastructure(format!("stored event date is malformed: {raw:?}")))
}

fn stored_u32(column: &str, value: i64) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("stored {column} out of range: {value}")))
}

#[derive(FromRow)]
struct EventRow {
    date: String,
    name: Option<String>,
    created_at: i64,
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord, DomainError> {
        Ok(EventRecord {
            date: stored_date(&self.date)?,
            name: self.name,
            created_at: from_micros(self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct BattleStateRow {
    version: i64,
    payload: String,
    updated_at: i64,
}

impl BattleStateRow {
    fn into_stored(self) -> Result<StoredBattleState, DomainError> {
        let payload = serde_json::from_str(&self.payload).map_err(|e| {
            DomainError::Infrastructure(format!("stored battle state is not JSON: {e}"))
        })?;
        Ok(StoredBattleState {
            version: self.version,
            payload,
            updated_at: from_micros(self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct RunRow {
    id: i64,
    event_date: String,
    round: i64,
    boss: i64,
    member_id: String,
    damage: i64,
    run_type: String,
    boss_table: String,
    recorded_at: i64,
}

impl RunRow {
    fn into_stored(self) -> Result<StoredRun, DomainError> {
        Ok(StoredRun {
            run_id: self.id,
            event_date: stored_date(&self.event_date)?,
            round: stored_u32("round", self.round)?,
            boss: stored_u32("boss", self.boss)?,
            member_id: MemberId::new(self.member_id),
            damage: u64::try_from(self.damage).map_err(|_| {
                DomainError::Infrastructure(format!("stored damage is negative: {}", self.damage))
            })?,
            run_type: self.run_type,
            boss_table: self.boss_table,
            recorded_at: from_micros(self.recorded_at)?,
        })
    }
}

#[derive(FromRow)]
struct MemberRow {
    member_id: String,
    name: String,
    nick: Option<String>,
}

impl From<MemberRow> for MemberRecord {
    fn from(row: MemberRow) -> Self {
        Self {
            member_id: MemberId::new(row.member_id),
            name: row.name,
            nick: row.nick,
        }
    }
}

async fn write_battle_state(
    tx: &mut Transaction<'_, Sqlite>,
    state: &StoredBattleState,
) -> Result<(), DomainError> {
    let payload = serde_json::to_string(&state.payload).map_err(|e| {
        DomainError::Infrastructure(format!("battle state serialization failed: {e}"))
    })?;
    sqlx::query(
        "INSERT INTO battle_state (id, version, payload, updated_at) VALUES (1, ?, ?, ?)
         ON CONFLICT (id) DO UPDATE SET
             version = excluded.version,
             payload = excluded.payload,
             updated_at = excluded.updated_at",
    )
    .bind(state.version)
    .bind(payload)
    .bind(state.updated_at.timestamp_micros())
    .execute(&mut **tx)
    .await
    .map_err(infra("write battle state"))?;
    Ok(())
}

async fn insert_run(tx: &mut Transaction<'_, Sqlite>, run: &NewRun) -> Result<RunId, DomainError> {
    let damage = i64::try_from(run.damage)
        .map_err(|_| DomainError::InvalidDamage(format!("{} is too large to record", run.damage)))?;
    let result = sqlx::query(
        "INSERT INTO runs
             (event_date, round, boss, member_id, damage, run_type, boss_table, recorded_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(run.event_date.to_string())
    .bind(i64::from(run.round))
    .bind(i64::from(run.boss))
    .bind(run.member_id.as_str())
    .bind(damage)
    .bind(run.run_type.as_str())
    .bind(run.boss_table.as_str())
    .bind(run.recorded_at.timestamp_micros())
    .execute(&mut **tx)
    .await
    .map_err(infra("append run"))?;
    Ok(result.last_insert_rowid())
}

#[async_trait]
impl TenantStore for SqliteTenantStore {
    async fn insert_event(&self, event: &EventRecord) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO events (date, name, created_at) VALUES (?, ?, ?)")
            .bind(event.date.to_string())
            .bind(event.name.as_deref())
            .bind(event.created_at.timestamp_micros())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateEvent(event.date)
                } else {
                    infra("insert event")(e)
                }
            })?;
        Ok(())
    }

    async fn find_event(&self, date: &EventDate) -> Result<Option<EventRecord>, DomainError> {
        sqlx::query_as::<_, EventRow>("SELECT date, name, created_at FROM events WHERE date = ?")
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra("load event"))?
            .map(EventRow::into_record)
            .transpose()
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>, DomainError> {
        sqlx::query_as::<_, EventRow>("SELECT date, name, created_at FROM events ORDER BY date")
            .fetch_all(&self.pool)
            .await
            .map_err(infra("list events"))?
            .into_iter()
            .map(EventRow::into_record)
            .collect()
    }

    async fn delete_event(&self, date: &EventDate) -> Result<bool, DomainError> {
        let key = date.to_string();
        let mut tx = self.begin().await?;

        let active: Option<String> =
            sqlx::query_scalar("SELECT event_date FROM active_event WHERE id = 1")
                .fetch_optional(&mut *tx)
                .await
                .map_err(infra("load active event"))?;
        let was_active = active.as_deref() == Some(key.as_str());

        let runs = sqlx::query("DELETE FROM runs WHERE event_date = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(infra("delete runs"))?
            .rows_affected();
        if was_active {
            sqlx::query("DELETE FROM active_event WHERE id = 1")
                .execute(&mut *tx)
                .await
                .map_err(infra("clear active event"))?;
            sqlx::query("DELETE FROM battle_state WHERE id = 1")
                .execute(&mut *tx)
                .await
                .map_err(infra("clear battle state"))?;
        }
        let deleted = sqlx::query("DELETE FROM events WHERE date = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(infra("delete event"))?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await.map_err(infra("roll back"))?;
            return Ok(false);
        }
        tx.commit().await.map_err(infra("commit event deletion"))?;
        debug!(date = %date, runs, was_active, "deleted event");
        Ok(true)
    }

    async fn active_event(&self) -> Result<Option<EventRecord>, DomainError> {
        sqlx::query_as::<_, EventRow>(
            "SELECT e.date, e.name, e.created_at
             FROM active_event a JOIN events e ON e.date = a.event_date
             WHERE a.id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(infra("load active event"))?
        .map(EventRow::into_record)
        .transpose()
    }

    async fn set_active_event(&self, date: &EventDate) -> Result<(), DomainError> {
        let key = date.to_string();
        let mut tx = self.begin().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE date = ?)")
            .bind(&key)
            .fetch_one(&mut *tx)
            .await
            .map_err(infra("look up event"))?;
        if !exists {
            tx.rollback().await.map_err(infra("roll back"))?;
            return Err(DomainError::UnknownEvent(*date));
        }
        sqlx::query(
            "INSERT INTO active_event (id, event_date) VALUES (1, ?)
             ON CONFLICT (id) DO UPDATE SET event_date = excluded.event_date",
        )
        .bind(&key)
        .execute(&mut *tx)
        .await
        .map_err(infra("set active event"))?;
        tx.commit().await.map_err(infra("commit active event"))
    }

    async fn get_battle_state(&self) -> Result<Option<StoredBattleState>, DomainError> {
        sqlx::query_as::<_, BattleStateRow>(
            "SELECT version, payload, updated_at FROM battle_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(infra("load battle state"))?
        .map(BattleStateRow::into_stored)
        .transpose()
    }

    async fn put_battle_state(&self, state: &StoredBattleState) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;
        write_battle_state(&mut tx, state).await?;
        tx.commit().await.map_err(infra("commit battle state"))
    }

    async fn clear_battle_state(&self) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM battle_state WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(infra("clear battle state"))?;
        Ok(())
    }

    async fn append_run(&self, run: &NewRun) -> Result<RunId, DomainError> {
        let mut tx = self.begin().await?;
        let run_id = insert_run(&mut tx, run).await?;
        tx.commit().await.map_err(infra("commit run"))?;
        Ok(run_id)
    }

    async fn list_runs_for_event(&self, date: &EventDate) -> Result<Vec<StoredRun>, DomainError> {
        sqlx::query_as::<_, RunRow>(
            "SELECT id, event_date, round, boss, member_id, damage, run_type, boss_table,
                    recorded_at
             FROM runs WHERE event_date = ?
             ORDER BY recorded_at, id",
        )
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(infra("list runs"))?
        .into_iter()
        .map(RunRow::into_stored)
        .collect()
    }

    async fn latest_run_at(&self, date: &EventDate) -> Result<Option<DateTime<Utc>>, DomainError> {
        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(recorded_at) FROM runs WHERE event_date = ?")
                .bind(date.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(infra("load latest run time"))?;
        latest.map(from_micros).transpose()
    }

    async fn delete_runs_for_event(&self, date: &EventDate) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM runs WHERE event_date = ?")
            .bind(date.to_string())
            .execute(&self.pool)
            .await
            .map_err(infra("delete runs"))?;
        Ok(result.rows_affected())
    }

    async fn commit_run(
        &self,
        state: Option<&StoredBattleState>,
        run: &NewRun,
    ) -> Result<RunId, DomainError> {
        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.begin().await?;
        if let Some(state) = state {
            write_battle_state(&mut tx, state).await?;
        }
        let run_id = insert_run(&mut tx, run).await?;
        tx.commit().await.map_err(infra("commit run"))?;
        Ok(run_id)
    }

    async fn add_member(&self, member: &MemberRecord) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT INTO members (member_id, name, nick) VALUES (?, ?, ?)
             ON CONFLICT (member_id) DO NOTHING",
        )
        .bind(member.member_id.as_str())
        .bind(&member.name)
        .bind(member.nick.as_deref())
        .execute(&self.pool)
        .await
        .map_err(infra("add member"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_member(&self, member_id: &MemberId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM members WHERE member_id = ?")
            .bind(member_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(infra("remove member"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn member_exists(&self, member_id: &MemberId) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM members WHERE member_id = ?)")
            .bind(member_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(infra("check membership"))
    }

    async fn list_members(&self) -> Result<Vec<MemberRecord>, DomainError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT member_id, name, nick FROM members ORDER BY member_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(infra("list members"))?;
        Ok(rows.into_iter().map(MemberRecord::from).collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
