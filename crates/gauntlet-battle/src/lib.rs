//! Gauntlet: Clan Battle bounded context.
//!
//! Responsible for the boss table, per-tenant battle progress, the run
//! ledger and the event lifecycle.

pub mod application;
pub mod domain;
