//! Domain error types.

use thiserror::Error;

use crate::ids::{EventDate, MemberId};

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The tenant has no active event, so no run can be accepted.
    #[error("no active event")]
    NoActiveEvent,

    /// A damage value was negative or not an integer.
    #[error("invalid damage value: {0}")]
    InvalidDamage(String),

    /// The submitting member is not on the tenant's roster.
    #[error("member {0} is not on the roster")]
    NotAMember(MemberId),

    /// The caller's view of the round is out of date.
    #[error("stale round: declared {declared}, current round is {current}")]
    StaleRound {
        /// The round the caller believed was current.
        declared: u32,
        /// The round actually in progress.
        current: u32,
    },

    /// Damage exceeded the remaining hit points without a finishing-blow flag.
    #[error("overkill rejected: damage {damage} exceeds remaining hit points {remaining}")]
    OverkillRejected {
        /// The submitted damage.
        damage: u64,
        /// Remaining hit points of the boss when the run was submitted.
        remaining: u64,
    },

    /// An event with this date already exists for the tenant.
    #[error("event {0} already exists")]
    DuplicateEvent(EventDate),

    /// No event with this date exists for the tenant.
    #[error("event {0} does not exist")]
    UnknownEvent(EventDate),

    /// An event date was empty or not in `YYYY-MM-DD` form.
    #[error("invalid event date: {0}")]
    InvalidEventDate(String),

    /// A malformed identifier or request value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The boss configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for storage and configuration faults, which are logged
    /// as errors rather than reported as ordinary rejections.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Infrastructure(_))
    }
}
