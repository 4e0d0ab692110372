//! Error types for the client core
//!
//! Every public entry point either returns a success value or fails with one
//! classified error; remote classifications are preserved, never downgraded
//! to a generic failure.

use crate::rpc::RpcError;
use meridian_common::StatusCode;
use thiserror::Error;

/// Client error taxonomy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// Transient commit-time conflict. Absorbed by the transaction runner up
    /// to its retry budget; terminal for the transaction manager, whose
    /// caller must `begin()` again.
    #[error("transaction aborted: {0}")]
    Aborted(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("operation cancelled")]
    Cancelled,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unknown error: {0}")]
    Unknown(String),

    /// At-least-once write failed after the request may have been sent.
    /// The caller cannot distinguish "not applied" from "applied, response
    /// lost"; the client performs no hidden deduplication.
    #[error("ambiguous outcome: {0}; the write may or may not have been applied")]
    AmbiguousOutcome(String),

    /// A lifecycle precondition was violated, e.g. committing a transaction
    /// manager that is not in the started state. No remote call was made.
    #[error("invalid transaction state: {0}")]
    InvalidState(String),
}

impl ClientError {
    /// The status code this error classifies as.
    pub fn code(&self) -> StatusCode {
        match self {
            ClientError::Aborted(_) => StatusCode::Aborted,
            ClientError::InvalidArgument(_) => StatusCode::InvalidArgument,
            ClientError::FailedPrecondition(_) | ClientError::InvalidState(_) => {
                StatusCode::FailedPrecondition
            }
            ClientError::PermissionDenied(_) => StatusCode::PermissionDenied,
            ClientError::NotFound(_) => StatusCode::NotFound,
            ClientError::DeadlineExceeded => StatusCode::DeadlineExceeded,
            ClientError::Cancelled => StatusCode::Cancelled,
            ClientError::Unavailable(_) | ClientError::AmbiguousOutcome(_) => {
                StatusCode::Unavailable
            }
            ClientError::Internal(_) => StatusCode::Internal,
            ClientError::Unknown(_) => StatusCode::Unknown,
        }
    }

    /// Whether a transactional retry loop may absorb this error.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ClientError::Aborted(_))
    }

    /// Whether this error signals cancellation and must stop retries.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::DeadlineExceeded | ClientError::Cancelled)
    }
}

impl From<RpcError> for ClientError {
    fn from(err: RpcError) -> Self {
        let RpcError { code, message } = err;
        match code {
            StatusCode::Aborted => ClientError::Aborted(message),
            StatusCode::InvalidArgument => ClientError::InvalidArgument(message),
            StatusCode::FailedPrecondition => ClientError::FailedPrecondition(message),
            StatusCode::PermissionDenied => ClientError::PermissionDenied(message),
            StatusCode::NotFound => ClientError::NotFound(message),
            StatusCode::DeadlineExceeded => ClientError::DeadlineExceeded,
            StatusCode::Cancelled => ClientError::Cancelled,
            StatusCode::Unavailable => ClientError::Unavailable(message),
            StatusCode::Internal => ClientError::Internal(message),
            StatusCode::Ok | StatusCode::Unknown => ClientError::Unknown(message),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
