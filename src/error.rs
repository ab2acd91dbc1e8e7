use thiserror::Error;

use crate::model::ModelError;
use crate::monitor::MonitorError;
use crate::ops::OpError;
use crate::registry::RegistryError;
use crate::secrets::SecretError;
use crate::store::StoreError;

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely no side effects occurred.
    None,
    /// Side effects definitely occurred (locally or remotely).
    Some,
    /// We don't know if side effects occurred.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

/// Crate-level convenience error.
///
/// A thin wrapper over the capability errors, not a god error.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Op(#[from] OpError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Op(e) => e.transience(),
            Error::Store(e) => e.transience(),
            Error::Registry(e) => e.transience(),
            Error::Monitor(e) => e.transience(),
            Error::Secret(e) => e.transience(),
            Error::Model(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Op(e) => e.effect(),
            Error::Store(e) => e.effect(),
            Error::Registry(e) => e.effect(),
            Error::Monitor(e) => e.effect(),
            Error::Secret(e) => e.effect(),
            Error::Model(_) => Effect::None,
        }
    }

    /// A suggested next command for the operator, when one exists.
    ///
    /// Printed under the diagnostic on failure so every dead end names a
    /// way forward.
    pub fn advice(&self) -> Option<String> {
        match self {
            Error::Store(StoreError::PublishConflict) => Some(
                "the store branch moved; the rejected commit is still on your local branch for inspection (git show); re-run the same command to publish against the refreshed state"
                    .to_string(),
            ),
            Error::Store(StoreError::InsufficientHistory { service, environment, .. }) => {
                Some(format!(
                    "not enough promotion history; roll back to an explicit tag instead: regatta rollback --service {service} --env {environment} --to-tag <TAG>"
                ))
            }
            Error::Op(OpError::SourceNotValidated { service, source_env, requested, .. }) => {
                Some(format!(
                    "promote the tag through {source_env} first: regatta promote --service {service} --tag {requested} --env {source_env}"
                ))
            }
            Error::Op(OpError::ApprovalDenied { .. }) => {
                Some("re-run and answer `yes`, or pass --yes to bypass the prompt".to_string())
            }
            Error::Registry(RegistryError::ArtifactNotFound(image)) => Some(format!(
                "check the tag exists in the registry (skopeo inspect --raw docker://{image}) or list published tags: regatta history --service <SERVICE> --env <ENV>"
            )),
            Error::Registry(RegistryError::ToolUnavailable(_)) => Some(
                "install the inspection tool, or set promotion.strictness = \"warn_and_proceed\" to accept unverified tags"
                    .to_string(),
            ),
            _ => None,
        }
    }
}
