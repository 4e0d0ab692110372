//! Results of successful commits and batch writes

use crate::status::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A commit timestamp, microseconds since the Unix epoch.
///
/// Timestamps are monotonic per database and order committed transactions
/// for read-your-writes purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitTimestamp(pub i64);

impl CommitTimestamp {
    pub fn as_micros(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CommitTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResponse {
    /// When the transaction committed.
    pub commit_timestamp: CommitTimestamp,
    /// Number of mutations applied, when the service reports it.
    pub mutation_count: Option<u64>,
}

impl CommitResponse {
    pub fn new(commit_timestamp: CommitTimestamp) -> Self {
        Self { commit_timestamp, mutation_count: None }
    }
}

/// Per-group outcome within a batch write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupStatus {
    /// The group committed atomically at the given timestamp.
    Ok { commit_timestamp: CommitTimestamp },
    /// The group failed; other groups are unaffected.
    Failed { code: StatusCode, message: String },
}

impl GroupStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, GroupStatus::Ok { .. })
    }
}

/// One entry of a batch-write result stream.
///
/// Results arrive in completion order, not submission order; each carries
/// the indexes of the mutation groups it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchWriteResult {
    /// Indexes into the submitted group list this result covers.
    pub group_indexes: Vec<usize>,
    /// Outcome for those groups.
    pub status: GroupStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_timestamps_order() {
        assert!(CommitTimestamp(1) < CommitTimestamp(2));
        assert_eq!(CommitTimestamp(5).as_micros(), 5);
    }

    #[test]
    fn test_group_status() {
        let ok = GroupStatus::Ok { commit_timestamp: CommitTimestamp(10) };
        let failed = GroupStatus::Failed {
            code: StatusCode::InvalidArgument,
            message: "bad column".to_string(),
        };
        assert!(ok.is_ok());
        assert!(!failed.is_ok());
    }
}
