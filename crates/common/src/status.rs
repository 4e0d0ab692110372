//! Status codes classifying remote outcomes
//!
//! The single classification that matters to the retry machinery is
//! `Aborted` versus everything else: an aborted commit is a transient
//! conflict and eligible for retry under a fresh transaction attempt; every
//! other code surfaces to the caller unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classification for remote commit/execute calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// The call succeeded.
    Ok,
    /// Transient commit-time conflict; the transaction may be retried from
    /// scratch under a fresh attempt.
    Aborted,
    InvalidArgument,
    FailedPrecondition,
    PermissionDenied,
    NotFound,
    DeadlineExceeded,
    Cancelled,
    /// Transport-level failure. On at-least-once paths this is ambiguous:
    /// the request may or may not have been applied.
    Unavailable,
    Internal,
    Unknown,
}

impl StatusCode {
    /// Whether a transactional retry loop may absorb this outcome.
    pub fn is_retryable_abort(self) -> bool {
        matches!(self, StatusCode::Aborted)
    }

    /// Whether this code signals caller-driven or deadline-driven
    /// cancellation, which stops retries immediately.
    pub fn is_cancellation(self) -> bool {
        matches!(self, StatusCode::DeadlineExceeded | StatusCode::Cancelled)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::Aborted => "ABORTED",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Internal => "INTERNAL",
            StatusCode::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_aborted_is_retryable() {
        assert!(StatusCode::Aborted.is_retryable_abort());
        for code in [
            StatusCode::Ok,
            StatusCode::InvalidArgument,
            StatusCode::FailedPrecondition,
            StatusCode::PermissionDenied,
            StatusCode::NotFound,
            StatusCode::DeadlineExceeded,
            StatusCode::Cancelled,
            StatusCode::Unavailable,
            StatusCode::Internal,
            StatusCode::Unknown,
        ] {
            assert!(!code.is_retryable_abort(), "{} must not retry", code);
        }
    }

    #[test]
    fn test_cancellation_codes() {
        assert!(StatusCode::DeadlineExceeded.is_cancellation());
        assert!(StatusCode::Cancelled.is_cancellation());
        assert!(!StatusCode::Aborted.is_cancellation());
    }
}
