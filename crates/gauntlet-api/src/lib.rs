//! Gauntlet API library: configuration, state, error mapping and routes,
//! shared by the server binary and the integration tests.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
