//! Time source for event, run and battle state timestamps.
//!
//! Runs are ordered in the ledger by the time they were recorded, so handlers
//! take the time from a [`Clock`] rather than reading the system clock, and
//! tests substitute a deterministic one.

use chrono::{DateTime, Utc};

/// Supplies the instant stamped on records as they are written.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
