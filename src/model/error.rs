use thiserror::Error;

/// Errors from parsing domain values.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ModelError {
    #[error("unknown service `{0}` (expected one of: frontend, catalogue, voting, recommendation)")]
    UnknownService(String),

    #[error("unknown environment `{0}` (expected one of: dev, staging, prod)")]
    UnknownEnvironment(String),

    #[error("invalid image reference `{0}`: {1}")]
    InvalidImageRef(String, &'static str),

    #[error("invalid tag `{0}`: {1}")]
    InvalidTag(String, &'static str),

    #[error("commit {commit} is not a promotion event: {reason}")]
    NotAnEvent { commit: String, reason: String },

    #[error("promotion event in {commit} is missing trailer `{trailer}`")]
    MissingTrailer {
        commit: String,
        trailer: &'static str,
    },
}
