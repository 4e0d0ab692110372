//! Remote service seam
//!
//! [`DatabaseService`] is the narrow interface the core drives: one commit
//! or execute call finalizes each unit of work, carrying the caller's
//! [`CallOptions`] unmodified. Implementations own transport, encoding, and
//! routing; the core owns buffering, retry, and lifecycle.

use meridian_common::{
    BatchWriteResult, CallOptions, CommitResponse, Mutation, MutationGroup, Statement, StatusCode,
};
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::session::Session;

/// Identifier of one transaction attempt, minted client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a commit request is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Part of a read-write transaction; the service may answer Aborted on
    /// conflict and the runner will retry under a fresh attempt.
    Transactional,
    /// Single-use commit without abort retry. Duplicate application is
    /// possible on ambiguous transport failure.
    AtLeastOnce,
}

/// A transaction attempt's buffered work, handed to the service as one
/// commit call.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub session: Session,
    pub transaction_id: TransactionId,
    /// 1-based attempt sequence number within one logical transaction.
    pub attempt: u64,
    pub mutations: Vec<Mutation>,
    pub options: CallOptions,
    pub mode: CommitMode,
}

/// Structured remote failure with a retryable/non-retryable classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: StatusCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// The one retryable classification.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Aborted, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Remote commit/execute interface.
pub trait DatabaseService: Send + Sync + 'static {
    /// Commit one transaction attempt's buffered mutations.
    fn commit(
        &self,
        request: CommitRequest,
    ) -> impl Future<Output = Result<CommitResponse, RpcError>> + Send;

    /// Best-effort rollback notification for an attempt that will not
    /// commit.
    fn rollback(
        &self,
        session: &Session,
        transaction_id: TransactionId,
    ) -> impl Future<Output = Result<(), RpcError>> + Send;

    /// Execute a DML statement inside an active read-write transaction
    /// attempt, returning affected rows.
    fn execute_update(
        &self,
        session: &Session,
        transaction_id: TransactionId,
        statement: Statement,
    ) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// Execute a partitioned DML statement outside transactional isolation,
    /// returning a lower-bound affected-row count.
    fn execute_partitioned_dml(
        &self,
        session: &Session,
        statement: Statement,
        options: &CallOptions,
    ) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// Apply mutation groups independently, non-atomically across groups.
    /// Per-group results arrive on the returned channel in completion
    /// order; the channel closing early signals a transport failure, and
    /// results already delivered remain valid.
    fn batch_write(
        &self,
        session: &Session,
        groups: Vec<MutationGroup>,
        options: &CallOptions,
    ) -> impl Future<Output = Result<mpsc::Receiver<BatchWriteResult>, RpcError>> + Send;
}
