//! Battle state: the per-tenant progress pointer.
//!
//! The state is folded from the run ledger. [`BattleState::apply`] is the only
//! transition, used both when a run is submitted and when the ledger is
//! replayed, so a replay from an empty start reproduces the persisted value.
//! A state is only valid for the boss table revision it records.

use chrono::{DateTime, Utc};
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::EventDate;
use gauntlet_core::repository::{StoredBattleState, StoredRun};
use serde::{Deserialize, Serialize};

use super::boss_table::{BossSlot, BossTable};
use super::run::RunType;

/// Current round, boss and remaining hit points of a tenant's active event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleState {
    /// The event this state tracks.
    pub event_date: EventDate,
    /// Current round, starting at 1.
    pub round: u32,
    /// Current boss position within the round, starting at 1.
    pub boss: u32,
    /// Remaining hit points of the current boss. Always positive between
    /// transactions.
    pub remaining_hp: u64,
    /// Number of accepted runs applied.
    pub version: i64,
    /// Revision of the boss table the state was computed against.
    #[serde(default)]
    pub boss_table: String,
}

impl BattleState {
    /// A fresh state at round 1, boss 1, with that boss's full pool.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the table has no entry for the first boss.
    pub fn initial(event_date: EventDate, table: &BossTable) -> Result<Self, DomainError> {
        Ok(Self {
            event_date,
            round: BossSlot::FIRST.round,
            boss: BossSlot::FIRST.position,
            remaining_hp: table.full_pool(BossSlot::FIRST)?,
            version: 0,
            boss_table: table.revision().to_owned(),
        })
    }

    /// Whether this state tracks `event_date` under `table`.
    #[must_use]
    pub fn is_current(&self, event_date: EventDate, table: &BossTable) -> bool {
        self.event_date == event_date && self.boss_table == table.revision()
    }

    /// The current boss coordinate.
    #[must_use]
    pub fn slot(&self) -> BossSlot {
        BossSlot {
            round: self.round,
            position: self.boss,
        }
    }

    /// Applies a classified run against the current boss.
    ///
    /// `Full` and `Leftover` subtract the damage; `Last` defeats the boss and
    /// moves to the next slot with its full pool, discarding any excess;
    /// `Lost` and `Unknown` change nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a `Full`/`Leftover` run would not
    /// leave the boss alive, and `DomainError::Config` if the next boss is
    /// missing from the table.
    pub fn apply(&mut self, run_type: RunType, damage: u64, table: &BossTable) -> Result<(), DomainError> {
        match run_type {
            RunType::Full | RunType::Leftover => {
                let remaining = self
                    .remaining_hp
                    .checked_sub(damage)
                    .filter(|remaining| *remaining > 0)
                    .ok_or_else(|| {
                        DomainError::Validation(format!(
                            "{run_type} run of {damage} does not fit remaining {}",
                            self.remaining_hp
                        ))
                    })?;
                self.remaining_hp = remaining;
            }
            RunType::Last => {
                let next = table.next_slot(self.slot())?;
                self.remaining_hp = table.full_pool(next)?;
                self.round = next.round;
                self.boss = next.position;
            }
            RunType::Lost | RunType::Unknown => return Ok(()),
        }
        self.version += 1;
        Ok(())
    }

    /// Rebuilds the state of `event_date` by folding its ledger from an empty
    /// start, in ledger insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if a run recorded against another boss
    /// table revision cannot be folded under `table`. Otherwise returns
    /// `DomainError::Infrastructure` if a run does not target the boss the
    /// fold has reached, and propagates [`BattleState::apply`] errors.
    pub fn replay(event_date: EventDate, runs: &[StoredRun], table: &BossTable) -> Result<Self, DomainError> {
        let mut ordered: Vec<&StoredRun> = runs.iter().collect();
        ordered.sort_by_key(|run| run.run_id);

        let mut state = Self::initial(event_date, table)?;
        for run in ordered {
            let run_type = RunType::from_name(&run.run_type);
            if !run_type.is_accepted() {
                continue;
            }
            state.fold(run, run_type, table).map_err(|err| {
                if run.boss_table == table.revision() {
                    err
                } else {
                    DomainError::Config(format!(
                        "boss table {} cannot replay run {} recorded against table {}: {err}",
                        short(table.revision()),
                        run.run_id,
                        short(&run.boss_table)
                    ))
                }
            })?;
        }
        Ok(state)
    }

    fn fold(&mut self, run: &StoredRun, run_type: RunType, table: &BossTable) -> Result<(), DomainError> {
        if (run.round, run.boss) != (self.round, self.boss) {
            return Err(DomainError::Infrastructure(format!(
                "ledger inconsistent at run {}: recorded against round {} boss {}, replay reached {}",
                run.run_id,
                run.round,
                run.boss,
                self.slot()
            )));
        }
        self.apply(run_type, run.damage, table)
    }

    /// Serializes the state for storage.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn to_stored(&self, updated_at: DateTime<Utc>) -> Result<StoredBattleState, DomainError> {
        let payload = serde_json::to_value(self).map_err(|e| {
            DomainError::Infrastructure(format!("battle state serialization failed: {e}"))
        })?;
        Ok(StoredBattleState {
            version: self.version,
            payload,
            updated_at,
        })
    }

    /// Deserializes a stored state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload is malformed.
    pub fn from_stored(stored: &StoredBattleState) -> Result<Self, DomainError> {
        serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("battle state deserialization failed: {e}"))
        })
    }
}

fn short(revision: &str) -> &str {
    if revision.is_empty() {
        "(untracked)"
    } else {
        revision.get(..12).unwrap_or(revision)
    }
}
