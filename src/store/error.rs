//! Store and publish error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::model::{Environment, ModelError, Service};

/// Errors from reading, staging, or publishing the desired-state store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to open repository at {0}: {1}")]
    OpenRepo(PathBuf, #[source] git2::Error),

    #[error("store branch not found: {0}")]
    NoBranch(String),

    #[error("failed to fetch from {remote}: {source}")]
    Fetch {
        remote: String,
        #[source]
        source: git2::Error,
    },

    #[error("no desired-state record for {service}/{environment} at {path}")]
    MissingRecord {
        service: Service,
        environment: Environment,
        path: String,
    },

    #[error("malformed record at {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    #[error("record at {path} belongs to {found}, expected {expected}")]
    RecordServiceMismatch {
        path: String,
        found: Service,
        expected: Service,
    },

    #[error("publish conflict: the store branch moved since it was read; refresh and retry")]
    PublishConflict,

    #[error("failed to push to {remote}: {source}")]
    Push {
        remote: String,
        #[source]
        source: git2::Error,
    },

    #[error("revision `{0}` does not resolve to a commit on the store branch")]
    InvalidRevision(String),

    #[error(
        "insufficient history for {service}/{environment}: needed {needed} matching event(s), found {available}"
    )]
    InsufficientHistory {
        service: Service,
        environment: Environment,
        needed: usize,
        available: usize,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl StoreError {
    /// Whether retrying may succeed.
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::PublishConflict | StoreError::Fetch { .. } | StoreError::Push { .. } => {
                Transience::Retryable
            }

            StoreError::OpenRepo(_, _)
            | StoreError::NoBranch(_)
            | StoreError::MissingRecord { .. }
            | StoreError::MalformedRecord { .. }
            | StoreError::RecordServiceMismatch { .. }
            | StoreError::InvalidRevision(_)
            | StoreError::InsufficientHistory { .. }
            | StoreError::Model(_) => Transience::Permanent,

            StoreError::Git(_) => Transience::Unknown,
        }
    }

    /// What we know about side effects when this error is returned.
    pub fn effect(&self) -> Effect {
        match self {
            // Push-phase failures occur after the local commit exists.
            StoreError::PublishConflict | StoreError::Push { .. } => Effect::Some,

            StoreError::Git(_) => Effect::Unknown,

            // Everything else fails before any mutation.
            _ => Effect::None,
        }
    }
}
