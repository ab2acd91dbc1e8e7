//! Promotion and rollback operations.
//!
//! Each invocation runs the same linear machine: validate, gate, mutate,
//! publish. Nothing is resumable across invocations; a failure surfaces the
//! partial state and a next command, and the operator re-invokes.

mod error;
mod gate;
pub mod promote;
pub mod rollback;

pub use error::OpError;
pub use gate::{ApprovalGate, ApprovalMode, PresetGate, StdinGate};
pub use promote::{PromoteOutcome, PromoteRequest};
pub use rollback::{RollbackOutcome, RollbackRequest, RollbackSelector};

/// The acting operator: `REGATTA_ACTOR` override, else `user@host`.
pub fn current_actor() -> String {
    if let Ok(actor) = std::env::var("REGATTA_ACTOR")
        && !actor.is_empty()
    {
        return actor;
    }
    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".into());
    format!("{username}@{hostname}")
}
