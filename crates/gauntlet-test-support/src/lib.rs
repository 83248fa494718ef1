//! Shared test mocks and utilities for the clan battle gauntlet tracker.

mod boss_data;
mod clock;
mod roster;
mod store;

pub use boss_data::SAMPLE_BOSS_DATA;
pub use clock::{FixedClock, SteppingClock};
pub use roster::{FailingRoster, StaticRoster};
pub use store::{InMemoryStoreOpener, InMemoryTenantStore};
