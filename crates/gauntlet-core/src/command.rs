//! Mutating requests.
//!
//! Every command targets exactly one tenant and carries a correlation id that
//! is attached to each log line produced while handling it.

use std::fmt;

use uuid::Uuid;

use crate::ids::TenantId;

/// Implemented by every command handled under a tenant's update lock.
pub trait Command: Send + Sync + fmt::Debug {
    /// Dotted name used in logs, e.g. `battle.submit_run`.
    fn command_type(&self) -> &'static str;

    /// Ties together the log lines of one request.
    fn correlation_id(&self) -> Uuid;

    /// The tenant whose data the command reads and writes.
    fn tenant_id(&self) -> &TenantId;
}
