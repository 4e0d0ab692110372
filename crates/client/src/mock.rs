//! In-memory collaborators for tests and examples
//!
//! [`MockDatabase`] implements [`DatabaseService`] at the protocol level:
//! it records every request, assigns monotonic commit timestamps, and can
//! be scripted to fail upcoming calls with specific status codes.
//! [`MockSessionProvider`] counts acquires and releases so tests can assert
//! scoped session discipline.

use crate::error::Result;
use crate::rpc::{CommitRequest, DatabaseService, RpcError, TransactionId};
use crate::session::{Session, SessionId, SessionProvider};
use meridian_common::{
    BatchWriteResult, CallOptions, CommitResponse, CommitTimestamp, GroupStatus, MutationGroup,
    Statement,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Session provider that mints sessions locally and counts borrow/return.
pub struct MockSessionProvider {
    database: String,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl MockSessionProvider {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Total sessions handed out.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Total sessions returned.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Sessions currently out on loan.
    pub fn active_sessions(&self) -> usize {
        self.acquired() - self.released()
    }
}

impl SessionProvider for MockSessionProvider {
    fn acquire(&self) -> impl std::future::Future<Output = Result<Session>> + Send {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let session = Session::new(SessionId::generate(), self.database.clone());
        async move { Ok(session) }
    }

    fn release(&self, _session: Session) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockState {
    last_timestamp: i64,
    commit_attempts: usize,
    applied_commits: Vec<CommitRequest>,
    rollbacks: Vec<TransactionId>,
    updates: Vec<(TransactionId, Statement)>,
    pdml_requests: Vec<(Statement, CallOptions)>,
    batch_requests: Vec<(Vec<MutationGroup>, CallOptions)>,
    commit_errors: VecDeque<RpcError>,
    update_errors: VecDeque<RpcError>,
    pdml_error: Option<RpcError>,
    pdml_rows: u64,
    update_rows: u64,
    group_failures: HashMap<usize, RpcError>,
    batch_cut_after: Option<usize>,
}

/// Scriptable in-memory [`DatabaseService`].
pub struct MockDatabase {
    state: Mutex<MockState>,
}

impl Default for MockDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDatabase {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState { update_rows: 1, ..MockState::default() }),
        }
    }

    /// Fail the next `n` commit calls with clones of `error`.
    pub fn fail_next_commits(&self, n: usize, error: RpcError) {
        let mut state = self.state.lock();
        for _ in 0..n {
            state.commit_errors.push_back(error.clone());
        }
    }

    /// Fail the next `execute_update` call.
    pub fn fail_next_update(&self, error: RpcError) {
        self.state.lock().update_errors.push_back(error);
    }

    /// Affected-row count reported by `execute_update`.
    pub fn set_update_rows(&self, rows: u64) {
        self.state.lock().update_rows = rows;
    }

    /// Affected-row count reported by partitioned DML.
    pub fn set_pdml_rows(&self, rows: u64) {
        self.state.lock().pdml_rows = rows;
    }

    /// Fail the next partitioned DML call.
    pub fn fail_pdml(&self, error: RpcError) {
        self.state.lock().pdml_error = Some(error);
    }

    /// Fail the group at `index` in the next batch write.
    pub fn fail_group(&self, index: usize, error: RpcError) {
        self.state.lock().group_failures.insert(index, error);
    }

    /// Simulate a transport failure after `n` batch results have been
    /// delivered: the result stream ends early.
    pub fn cut_batch_after(&self, n: usize) {
        self.state.lock().batch_cut_after = Some(n);
    }

    /// Total commit calls, including failed ones.
    pub fn commit_attempts(&self) -> usize {
        self.state.lock().commit_attempts
    }

    /// Number of commits that were applied.
    pub fn commit_count(&self) -> usize {
        self.state.lock().applied_commits.len()
    }

    /// The applied commit requests, in commit order.
    pub fn commit_requests(&self) -> Vec<CommitRequest> {
        self.state.lock().applied_commits.clone()
    }

    pub fn rollback_count(&self) -> usize {
        self.state.lock().rollbacks.len()
    }

    pub fn update_count(&self) -> usize {
        self.state.lock().updates.len()
    }

    /// The partitioned DML requests received, with their options.
    pub fn pdml_requests(&self) -> Vec<(Statement, CallOptions)> {
        self.state.lock().pdml_requests.clone()
    }

    /// The batch-write submissions received, with their options.
    pub fn batch_requests(&self) -> Vec<(Vec<MutationGroup>, CallOptions)> {
        self.state.lock().batch_requests.clone()
    }
}

impl DatabaseService for MockDatabase {
    async fn commit(&self, request: CommitRequest) -> std::result::Result<CommitResponse, RpcError> {
        let mut state = self.state.lock();
        state.commit_attempts += 1;
        if let Some(error) = state.commit_errors.pop_front() {
            return Err(error);
        }
        state.last_timestamp += 1;
        let response = CommitResponse {
            commit_timestamp: CommitTimestamp(state.last_timestamp),
            mutation_count: Some(request.mutations.len() as u64),
        };
        state.applied_commits.push(request);
        Ok(response)
    }

    async fn rollback(
        &self,
        _session: &Session,
        transaction_id: TransactionId,
    ) -> std::result::Result<(), RpcError> {
        self.state.lock().rollbacks.push(transaction_id);
        Ok(())
    }

    async fn execute_update(
        &self,
        _session: &Session,
        transaction_id: TransactionId,
        statement: Statement,
    ) -> std::result::Result<u64, RpcError> {
        let mut state = self.state.lock();
        if let Some(error) = state.update_errors.pop_front() {
            return Err(error);
        }
        state.updates.push((transaction_id, statement));
        Ok(state.update_rows)
    }

    async fn execute_partitioned_dml(
        &self,
        _session: &Session,
        statement: Statement,
        options: &CallOptions,
    ) -> std::result::Result<u64, RpcError> {
        let mut state = self.state.lock();
        if let Some(error) = state.pdml_error.take() {
            return Err(error);
        }
        state.pdml_requests.push((statement, options.clone()));
        Ok(state.pdml_rows)
    }

    async fn batch_write(
        &self,
        _session: &Session,
        groups: Vec<MutationGroup>,
        options: &CallOptions,
    ) -> std::result::Result<mpsc::Receiver<BatchWriteResult>, RpcError> {
        let mut results = Vec::with_capacity(groups.len());
        let cut_after = {
            let mut state = self.state.lock();
            state.batch_requests.push((groups.clone(), options.clone()));
            for index in 0..groups.len() {
                let status = match state.group_failures.remove(&index) {
                    Some(error) => GroupStatus::Failed {
                        code: error.code,
                        message: error.message,
                    },
                    None => {
                        state.last_timestamp += 1;
                        GroupStatus::Ok {
                            commit_timestamp: CommitTimestamp(state.last_timestamp),
                        }
                    }
                };
                results.push(BatchWriteResult { group_indexes: vec![index], status });
            }
            state.batch_cut_after.take()
        };

        if let Some(n) = cut_after {
            results.truncate(n);
        }

        let (tx, rx) = mpsc::channel(results.len().max(1));
        tokio::spawn(async move {
            for result in results {
                // Consumer gone; stop delivering.
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
