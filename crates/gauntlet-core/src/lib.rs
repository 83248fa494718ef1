//! Gauntlet Core: shared domain abstractions.
//!
//! This crate defines the identifiers, error type, storage traits and the
//! per-tenant store router that every other crate depends on. It performs no
//! I/O of its own; storage backends plug in through [`tenant::StoreOpener`].

pub mod clock;
pub mod command;
pub mod error;
pub mod ids;
pub mod repository;
pub mod tenant;
