//! Application layer for the Clan Battle context.

pub mod command_handlers;
pub mod query_handlers;
pub mod roster_handlers;
