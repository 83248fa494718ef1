//! Domain layer for the Clan Battle context.

pub mod battle_state;
pub mod boss_table;
pub mod commands;
pub mod run;
