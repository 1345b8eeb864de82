//! Error types for dbward.

use thiserror::Error;

/// Result type alias for dbward operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure category, stable across error variants.
///
/// Transport layers map this to an outward status without inspecting
/// free-text messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown identifier, or one the caller is not allowed to see.
    NotFound,
    /// Workflow transition attempted from a terminal or wrong state.
    InvalidState,
    /// Statement failed the keyword gate or a remote-only policy.
    PolicyViolation,
    /// A collaborator (probe, executor, generator) failed or timed out.
    UpstreamFailure,
    /// Malformed data inside the core itself.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::InvalidState => write!(f, "invalid_state"),
            ErrorKind::PolicyViolation => write!(f, "policy_violation"),
            ErrorKind::UpstreamFailure => write!(f, "upstream_failure"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Errors that can occur in dbward operations.
#[derive(Error, Debug)]
pub enum Error {
    // Workflow errors
    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("proposal is already {0}")]
    InvalidState(String),

    // Policy errors
    #[error("statement rejected by gate: {0}")]
    PolicyViolation(String),

    #[error("local database endpoints are not allowed: {0}")]
    LocalEndpoint(String),

    // Upstream collaborator errors
    #[error("connection failed: {0}")]
    ConnectivityFailed(String),

    #[error("migration generation failed: {0}")]
    GenerationFailed(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("upstream call timed out after {0:?}")]
    UpstreamTimeout(std::time::Duration),

    // Vault errors
    #[error("secret unsealing failed: {0}")]
    UnsealFailed(String),

    // Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ProposalNotFound(_) => ErrorKind::NotFound,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::PolicyViolation(_) | Error::LocalEndpoint(_) => ErrorKind::PolicyViolation,
            Error::ConnectivityFailed(_)
            | Error::GenerationFailed(_)
            | Error::ExecutionFailed(_)
            | Error::UpstreamTimeout(_) => ErrorKind::UpstreamFailure,
            Error::UnsealFailed(_) | Error::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
