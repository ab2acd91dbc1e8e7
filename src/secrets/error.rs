use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::model::Service;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SecretError {
    #[error(
        "no value for required secret {service}/{category}/{field} (set {env_var} or use --interactive)"
    )]
    MissingValue {
        service: Service,
        category: String,
        field: String,
        env_var: String,
    },

    #[error("secret backend CLI unavailable: {0}")]
    ToolUnavailable(String),

    #[error("secret backend operation failed: {0}")]
    BackendFailed(String),

    #[error("prompt failed: {0}")]
    PromptFailed(String),
}

impl SecretError {
    pub fn transience(&self) -> Transience {
        match self {
            SecretError::MissingValue { .. } => Transience::Permanent,
            SecretError::ToolUnavailable(_) | SecretError::BackendFailed(_) => {
                Transience::Retryable
            }
            SecretError::PromptFailed(_) => Transience::Unknown,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            // A failed bundle write may have landed partially before the
            // failure; earlier bundles in the same run definitely did.
            SecretError::BackendFailed(_) => Effect::Unknown,
            _ => Effect::None,
        }
    }
}
