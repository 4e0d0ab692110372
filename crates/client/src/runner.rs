//! Retry orchestration for read-write transactions
//!
//! [`TransactionRunner`] wraps a user-supplied transactional function in the
//! abort-retry loop: each attempt gets a fresh [`TransactionContext`], and an
//! `Aborted` outcome discards the attempt's buffered state entirely before
//! the function is re-invoked from scratch. The user function must therefore
//! be idempotent with respect to side effects outside the transaction; the
//! runner cannot enforce that, only document it.
//!
//! Attempts within one runner are strictly sequential. Retries use
//! exponential backoff with jitter, bounded by an elapsed-time budget and by
//! an optional caller deadline which also bounds each in-flight remote call.

use crate::context::TransactionContext;
use crate::error::{ClientError, Result};
use crate::rpc::{CommitMode, CommitRequest, DatabaseService};
use crate::session::{SessionGuard, SessionProvider};
use meridian_common::{CallOptions, CommitResponse};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backoff and budget configuration for the abort-retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Backoff cap for the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
    /// Growth factor applied per retry.
    pub backoff_multiplier: f64,
    /// Total elapsed-time budget; once exceeded, the last `Aborted` error
    /// surfaces as terminal.
    pub retry_budget: Duration,
    /// Absolute caller deadline. When it passes, no further remote calls
    /// are attempted and `DeadlineExceeded` surfaces.
    pub deadline: Option<Instant>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_secs(4),
            backoff_multiplier: 1.6,
            retry_budget: Duration::from_secs(30),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Jittered delay before retry number `retry` (0-based): uniform in
    /// `(0, cap]` where cap grows exponentially up to `max_backoff`.
    fn backoff_delay(&self, retry: u32) -> Duration {
        let cap =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(retry as i32);
        let cap = cap.min(self.max_backoff.as_secs_f64());
        let jittered = rand::thread_rng().gen_range(0.0..=cap);
        Duration::from_secs_f64(jittered.max(0.001))
    }

    fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Drives one logical read-write transaction to a single successful commit.
pub struct TransactionRunner<P: SessionProvider, S: DatabaseService> {
    sessions: Arc<P>,
    service: Arc<S>,
    policy: RetryPolicy,
    options: CallOptions,
}

impl<P: SessionProvider, S: DatabaseService> TransactionRunner<P, S> {
    pub(crate) fn new(
        sessions: Arc<P>,
        service: Arc<S>,
        policy: RetryPolicy,
        options: CallOptions,
    ) -> Self {
        Self { sessions, service, policy, options }
    }

    /// Set an absolute deadline for the whole retry loop.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.policy.deadline = Some(deadline);
        self
    }

    /// Run `work` under fresh transaction attempts until one commits or a
    /// non-retryable error occurs. Exactly one successful commit produces
    /// exactly one [`CommitResponse`], returned alongside the work's value.
    pub async fn run<T, F, Fut>(&self, work: F) -> Result<(T, CommitResponse)>
    where
        F: Fn(TransactionContext<S>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.policy.deadline_expired() {
            return Err(ClientError::DeadlineExceeded);
        }

        let started = Instant::now();
        let guard = SessionGuard::acquire(self.sessions.clone()).await?;
        let mut retries: u32 = 0;

        loop {
            let attempt = u64::from(retries) + 1;
            let ctx =
                TransactionContext::new(self.service.clone(), guard.session().clone(), attempt);

            let abort_err = match self.attempt_once(&guard, &ctx, &work).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_aborted() => err,
                Err(err) => return Err(err),
            };

            let delay = self.policy.backoff_delay(retries);
            if started.elapsed() + delay > self.policy.retry_budget {
                tracing::debug!(
                    attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "retry budget exhausted, surfacing abort"
                );
                return Err(abort_err);
            }
            if let Some(deadline) = self.policy.deadline {
                if Instant::now() + delay >= deadline {
                    return Err(ClientError::DeadlineExceeded);
                }
            }

            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "transaction aborted, backing off");
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }

    /// One attempt: invoke the work, then commit its buffer with the
    /// caller's options attached. The context is invalidated on every exit
    /// path so the attempt's buffered state cannot leak into the next one.
    async fn attempt_once<T, F, Fut>(
        &self,
        guard: &SessionGuard<P>,
        ctx: &TransactionContext<S>,
        work: &F,
    ) -> Result<(T, CommitResponse)>
    where
        F: Fn(TransactionContext<S>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let value = match self.bounded(work(ctx.clone())).await {
            Ok(value) => value,
            Err(err) => {
                ctx.invalidate();
                if !err.is_aborted() && !err.is_cancellation() {
                    self.rollback_best_effort(guard, ctx).await;
                }
                return Err(err);
            }
        };

        let request = CommitRequest {
            session: guard.session().clone(),
            transaction_id: ctx.transaction_id(),
            attempt: ctx.attempt(),
            mutations: ctx.take_mutations()?,
            options: self.options.clone(),
            mode: CommitMode::Transactional,
        };
        ctx.invalidate();

        let commit = self.bounded(async {
            self.service.commit(request).await.map_err(ClientError::from)
        });
        let response = commit.await?;
        Ok((value, response))
    }

    async fn rollback_best_effort(&self, guard: &SessionGuard<P>, ctx: &TransactionContext<S>) {
        if let Err(err) = self
            .service
            .rollback(guard.session(), ctx.transaction_id())
            .await
        {
            tracing::warn!(transaction_id = %ctx.transaction_id(), %err, "best-effort rollback failed");
        }
    }

    /// Bound a step by the caller deadline, if any.
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.policy.deadline {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(deadline);
                match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::DeadlineExceeded),
                }
            }
            None => fut.await,
        }
    }
}
