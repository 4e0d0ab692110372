//! Non-interactive write paths
//!
//! [`WriteExecutor`] implements the four non-interactive entry points:
//! transactional `write`, single-attempt `write_at_least_once`, non-atomic
//! `batch_write_at_least_once`, and `partitioned_update`. Each threads the
//! caller's [`CallOptions`] unmodified to the single remote call that
//! finalizes it.

use crate::error::{ClientError, Result};
use crate::rpc::{CommitMode, CommitRequest, DatabaseService, TransactionId};
use crate::runner::{RetryPolicy, TransactionRunner};
use crate::session::{SessionGuard, SessionProvider};
use meridian_common::{
    BatchWriteResult, CallOptions, CommitResponse, Mutation, MutationGroup, Statement,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Executes the non-interactive write paths against one database.
pub struct WriteExecutor<P: SessionProvider, S: DatabaseService> {
    sessions: Arc<P>,
    service: Arc<S>,
    policy: RetryPolicy,
}

impl<P: SessionProvider, S: DatabaseService> WriteExecutor<P, S> {
    pub(crate) fn new(sessions: Arc<P>, service: Arc<S>, policy: RetryPolicy) -> Self {
        Self { sessions, service, policy }
    }

    /// Apply the mutations in one implicit read-write transaction, with
    /// full abort-retry semantics.
    pub async fn write(
        &self,
        mutations: Vec<Mutation>,
        options: CallOptions,
    ) -> Result<CommitResponse> {
        let runner = TransactionRunner::new(
            self.sessions.clone(),
            self.service.clone(),
            self.policy.clone(),
            options,
        );
        let ((), response) = runner
            .run(|ctx| {
                let mutations = mutations.clone();
                async move { ctx.buffer_many(mutations) }
            })
            .await?;
        Ok(response)
    }

    /// Apply the mutations with a single commit attempt and no abort retry.
    ///
    /// Suitable only for mutations safe to apply more than once: on an
    /// ambiguous transport failure the write may or may not have been
    /// applied, surfaced as [`ClientError::AmbiguousOutcome`].
    pub async fn write_at_least_once(
        &self,
        mutations: Vec<Mutation>,
        options: CallOptions,
    ) -> Result<CommitResponse> {
        let guard = SessionGuard::acquire(self.sessions.clone()).await?;
        let request = CommitRequest {
            session: guard.session().clone(),
            transaction_id: TransactionId::generate(),
            attempt: 1,
            mutations,
            options,
            mode: CommitMode::AtLeastOnce,
        };
        self.service.commit(request).await.map_err(|err| {
            match ClientError::from(err) {
                // Transport failure once the request may have been sent: the
                // caller cannot tell "not applied" from "applied, response
                // lost".
                ClientError::Unavailable(message) => ClientError::AmbiguousOutcome(message),
                other => other,
            }
        })
    }

    /// Apply mutation groups independently: atomic within a group, not
    /// across groups. Results arrive in completion order, one per group; a
    /// failed group does not prevent others from succeeding, so callers
    /// must inspect every [`BatchWriteResult`] status. If the stream ends
    /// before every group is reported, a transport failure occurred and the
    /// results already delivered remain valid.
    pub async fn batch_write_at_least_once(
        &self,
        groups: Vec<MutationGroup>,
        options: CallOptions,
    ) -> Result<BatchWriteStream<P>> {
        let guard = SessionGuard::acquire(self.sessions.clone()).await?;
        let receiver = self
            .service
            .batch_write(guard.session(), groups, &options)
            .await
            .map_err(ClientError::from)?;
        Ok(BatchWriteStream { receiver, _guard: guard })
    }

    /// Execute a statement the service partitions and applies outside
    /// standard transactional isolation. Returns a lower bound on affected
    /// rows. No retry happens at this layer; on failure, partial
    /// application across partitions is possible and caller-visible.
    pub async fn partitioned_update(
        &self,
        statement: Statement,
        options: CallOptions,
    ) -> Result<u64> {
        let guard = SessionGuard::acquire(self.sessions.clone()).await?;
        self.service
            .execute_partitioned_dml(guard.session(), statement, &options)
            .await
            .map_err(ClientError::from)
    }
}

/// Forward-only stream of per-group batch-write results.
///
/// Holds the session for the batch; dropping the stream (drained or not)
/// releases it.
pub struct BatchWriteStream<P: SessionProvider> {
    receiver: mpsc::Receiver<BatchWriteResult>,
    _guard: SessionGuard<P>,
}

impl<P: SessionProvider> BatchWriteStream<P> {
    /// Next per-group result, or `None` once the stream is finished.
    pub async fn next(&mut self) -> Option<BatchWriteResult> {
        self.receiver.recv().await
    }

    /// Drain the remaining results into a list.
    pub async fn collect(mut self) -> Vec<BatchWriteResult> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }
}
