//! Runs: damage values, classification and outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gauntlet_core::error::DomainError;
use gauntlet_core::ids::{EventDate, MemberId};
use gauntlet_core::repository::{RunId, StoredRun};
use serde::{Deserialize, Serialize};

/// Classification of a submitted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    /// Damage fully absorbed; the boss survives.
    Full,
    /// The run defeated the boss.
    Last,
    /// A declared finishing blow that fell short of the kill.
    Leftover,
    /// Recorded for audit but rejected; battle state unchanged.
    Lost,
    /// The stored classification could not be read.
    Unknown,
}

impl RunType {
    /// Stable lowercase name used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Last => "last",
            Self::Leftover => "leftover",
            Self::Lost => "lost",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a run of this type changes the battle state.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Full | Self::Last | Self::Leftover)
    }

    /// Parses a stored name. Anything unrecognised maps to `Unknown`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "full" => Self::Full,
            "last" => Self::Last,
            "leftover" => Self::Leftover,
            "lost" => Self::Lost,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a run from the declared finishing-blow intent, the damage and
/// the boss's remaining hit points before the run.
#[must_use]
pub fn classify(finishing_blow: bool, damage: u64, remaining: u64) -> RunType {
    use std::cmp::Ordering;

    match damage.cmp(&remaining) {
        Ordering::Less if finishing_blow => RunType::Leftover,
        Ordering::Less => RunType::Full,
        Ordering::Equal => RunType::Last,
        Ordering::Greater if finishing_blow => RunType::Last,
        Ordering::Greater => RunType::Lost,
    }
}

/// A validated, non-negative damage value that fits the ledger's integer
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Damage(u64);

impl Damage {
    /// The damage value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Damage {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| DomainError::InvalidDamage(value.to_string()))
    }
}

impl FromStr for Damage {
    type Err = DomainError;

    /// Accepts plain ASCII digits only: no sign, separators or decimals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidDamage(s.to_owned());
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: i64 = s.parse().map_err(|_| invalid())?;
        Self::try_from(value)
    }
}

/// Damage exactly as submitted, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDamage {
    /// An integer value; negatives are rejected on validation.
    Integer(i64),
    /// Text as typed by a member; digits only.
    Text(String),
}

impl RawDamage {
    /// Validates the submitted value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDamage` for negative integers and for
    /// text that is not a plain digit string within range.
    pub fn validate(&self) -> Result<Damage, DomainError> {
        match self {
            Self::Integer(value) => Damage::try_from(*value),
            Self::Text(text) => text.trim().parse(),
        }
    }
}

impl From<i64> for RawDamage {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Result of a run submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Ledger identifier of the recorded run.
    pub run_id: RunId,
    /// Whether the run was applied to the battle state.
    pub accepted: bool,
    /// Submitted damage.
    pub damage: u64,
    /// Classification of the run.
    pub run_type: RunType,
    /// Remaining hit points of the current boss after the run. After a kill
    /// this is the next boss's full pool.
    pub remaining_hp_after: u64,
    /// Current round after the run.
    pub round: u32,
    /// Current boss position after the run.
    pub boss: u32,
    /// Damage in excess of the boss's remaining hit points. Never carried
    /// into the next boss.
    pub overkill: u64,
}

impl RunOutcome {
    /// Converts a rejected outcome into its error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::OverkillRejected` when the run was not accepted.
    pub fn into_result(self) -> Result<Self, DomainError> {
        if self.accepted {
            Ok(self)
        } else {
            Err(DomainError::OverkillRejected {
                damage: self.damage,
                remaining: self.remaining_hp_after,
            })
        }
    }
}

/// Read-only view of one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunView {
    /// Ledger identifier.
    pub run_id: RunId,
    /// Event the run belongs to.
    pub event_date: EventDate,
    /// Round of the targeted boss.
    pub round: u32,
    /// Position of the targeted boss.
    pub boss: u32,
    /// Submitting member.
    pub member_id: MemberId,
    /// Submitted damage.
    pub damage: u64,
    /// Classification.
    pub run_type: RunType,
    /// Submission time.
    pub recorded_at: DateTime<Utc>,
}

impl From<&StoredRun> for RunView {
    fn from(run: &StoredRun) -> Self {
        Self {
            run_id: run.run_id,
            event_date: run.event_date,
            round: run.round,
            boss: run.boss,
            member_id: run.member_id.clone(),
            damage: run.damage,
            run_type: RunType::from_name(&run.run_type),
            recorded_at: run.recorded_at,
        }
    }
}
