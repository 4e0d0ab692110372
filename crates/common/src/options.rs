//! Per-call options attached to writes and transactions
//!
//! Options are an immutable mapping from recognized option keys to values.
//! Each key is optional; accessors return the documented default when a key
//! was never set, so an empty [`CallOptions`] is semantically identical to
//! passing no options at all. [`CallOptions::merge`] combines two option
//! sets with later-wins semantics per key.

use serde::{Deserialize, Serialize};

/// Scheduling priority hint forwarded to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Immutable per-call option set.
///
/// Recognized keys:
/// - `exclude_txn_from_change_streams` (default `false`): suppress capture
///   of this unit of work by any change stream watching the affected tables;
/// - `priority` (default [`Priority::Medium`]): scheduling hint;
/// - `tag` (default empty): opaque request label for server-side diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    exclude_txn_from_change_streams: Option<bool>,
    priority: Option<Priority>,
    tag: Option<String>,
}

impl CallOptions {
    /// An empty option set, identical to passing no options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the change-stream exclusion flag.
    pub fn exclude_txn_from_change_streams() -> Self {
        Self::new().with_exclude_txn_from_change_streams(true)
    }

    /// Set whether the transaction's effects are excluded from change
    /// streams.
    pub fn with_exclude_txn_from_change_streams(mut self, exclude: bool) -> Self {
        self.exclude_txn_from_change_streams = Some(exclude);
        self
    }

    /// Set the scheduling priority hint.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the opaque request tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Merge two option sets; keys set in `later` override keys set here.
    pub fn merge(self, later: CallOptions) -> CallOptions {
        CallOptions {
            exclude_txn_from_change_streams: later
                .exclude_txn_from_change_streams
                .or(self.exclude_txn_from_change_streams),
            priority: later.priority.or(self.priority),
            tag: later.tag.or(self.tag),
        }
    }

    /// Whether this unit of work is excluded from change-stream capture.
    pub fn excludes_txn_from_change_streams(&self) -> bool {
        self.exclude_txn_from_change_streams.unwrap_or(false)
    }

    /// The effective scheduling priority.
    pub fn priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    /// The effective request tag; empty when unset.
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }
}
