//! Meridian Common - Shared data model for the Meridian database client
//!
//! This crate holds the leaf types exchanged between callers and the client
//! core: values, mutations, per-call options, commit responses, and status
//! codes. Everything here is immutable once built and serde-serializable so
//! it can cross the wire unchanged.

pub mod mutation;
pub mod options;
pub mod response;
pub mod statement;
pub mod status;
pub mod value;

pub use mutation::{KeyRange, KeySet, Mutation, MutationGroup, WriteBuilder};
pub use options::{CallOptions, Priority};
pub use response::{BatchWriteResult, CommitResponse, CommitTimestamp, GroupStatus};
pub use statement::Statement;
pub use status::StatusCode;
pub use value::{Key, Value};
