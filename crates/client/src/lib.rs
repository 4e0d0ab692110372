//! Meridian Client - transactional client core for the Meridian database
//!
//! This crate implements the client side of the commit protocol: buffering
//! row mutations into transaction attempts, retrying aborted transactions
//! with backoff, manual transaction management, and the non-interactive
//! write paths (at-least-once, batch at-least-once, partitioned DML).
//!
//! Transport, authentication, and session pooling live behind two narrow
//! seams: [`SessionProvider`] hands out sessions, [`DatabaseService`]
//! performs the remote commit/execute calls. Per-call options such as
//! change-stream exclusion are threaded unmodified to the single remote
//! call that finalizes each unit of work.
//!
//! ```ignore
//! let client = DatabaseClient::new(sessions, service);
//! let response = client
//!     .write(
//!         vec![Mutation::insert_or_update("Singers")
//!             .set("SingerId", 4520i64)
//!             .set("FirstName", "Lauren")
//!             .build()],
//!         CallOptions::exclude_txn_from_change_streams(),
//!     )
//!     .await?;
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod executor;
pub mod manager;
pub mod mock;
pub mod rpc;
pub mod runner;
pub mod session;

pub use client::{ClientConfig, DatabaseClient};
pub use context::TransactionContext;
pub use error::{ClientError, Result};
pub use executor::{BatchWriteStream, WriteExecutor};
pub use manager::{TransactionManager, TransactionState};
pub use rpc::{CommitMode, CommitRequest, DatabaseService, RpcError, TransactionId};
pub use runner::{RetryPolicy, TransactionRunner};
pub use session::{Session, SessionGuard, SessionId, SessionProvider};

pub use meridian_common::{
    BatchWriteResult, CallOptions, CommitResponse, CommitTimestamp, GroupStatus, KeyRange, KeySet,
    Mutation, MutationGroup, Priority, Statement, StatusCode, Value,
};
