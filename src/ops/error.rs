use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::model::{Environment, Service};

/// Operation-level failures: inputs and gates.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OpError {
    #[error("validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error(
        "cannot promote {service} to prod: {source_env} is at `{found}`, not the requested `{requested}`"
    )]
    SourceNotValidated {
        service: Service,
        source_env: Environment,
        requested: String,
        found: String,
    },

    #[error("{operation} not approved by operator")]
    ApprovalDenied { operation: &'static str },
}

impl OpError {
    pub fn transience(&self) -> Transience {
        // Gate refusals and bad inputs never succeed on retry alone.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        // All gates run before any mutation.
        Effect::None
    }
}
