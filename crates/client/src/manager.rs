//! Explicit transaction control
//!
//! [`TransactionManager`] is for callers who cannot express their logic as a
//! single retryable closure: it exposes begin/commit/rollback directly and
//! leaves the retry decision to the caller. After an aborted commit the
//! caller must `begin()` again and rebuffer; nothing is carried over from
//! the failed attempt.
//!
//! The manager owns exactly one session for its whole lifetime, released
//! exactly once when the manager is dropped, whatever state it ended in.

use crate::context::TransactionContext;
use crate::error::{ClientError, Result};
use crate::rpc::{CommitMode, CommitRequest, DatabaseService};
use crate::session::{SessionGuard, SessionProvider};
use meridian_common::{CallOptions, CommitResponse};
use std::sync::Arc;

/// Lifecycle state of a [`TransactionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No attempt begun yet.
    NotStarted,
    /// An attempt is active and accepting buffered work.
    Started,
    /// A commit call is in flight.
    Committing,
    /// Terminal: the transaction committed.
    Committed,
    /// The last commit hit a conflict; `begin()` starts a fresh attempt.
    Aborted,
    /// Terminal: rolled back at the caller's request.
    RolledBack,
    /// Terminal: a non-retryable error ended the transaction.
    Failed,
}

impl TransactionState {
    /// Whether no further operations are valid.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::RolledBack | TransactionState::Failed
        )
    }
}

/// Manual begin/commit/rollback control over a sequence of transaction
/// attempts on one session.
pub struct TransactionManager<P: SessionProvider, S: DatabaseService> {
    service: Arc<S>,
    guard: SessionGuard<P>,
    options: CallOptions,
    state: TransactionState,
    context: Option<TransactionContext<S>>,
    attempt: u64,
}

impl<P: SessionProvider, S: DatabaseService> TransactionManager<P, S> {
    pub(crate) fn new(service: Arc<S>, guard: SessionGuard<P>, options: CallOptions) -> Self {
        Self {
            service,
            guard,
            options,
            state: TransactionState::NotStarted,
            context: None,
            attempt: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Start a fresh attempt. Valid before the first attempt and after an
    /// aborted commit; the returned context starts with an empty buffer.
    pub fn begin(&mut self) -> Result<TransactionContext<S>> {
        match self.state {
            TransactionState::NotStarted | TransactionState::Aborted => {}
            other => {
                return Err(ClientError::InvalidState(format!(
                    "begin() is not valid in state {:?}",
                    other
                )));
            }
        }

        self.attempt += 1;
        let ctx = TransactionContext::new(
            self.service.clone(),
            self.guard.session().clone(),
            self.attempt,
        );
        self.context = Some(ctx.clone());
        self.state = TransactionState::Started;
        Ok(ctx)
    }

    /// Commit the current attempt's buffered mutations, attaching the
    /// manager's call options. On conflict the state becomes
    /// [`TransactionState::Aborted`] and the caller must `begin()` again.
    pub async fn commit(&mut self) -> Result<CommitResponse> {
        if self.state != TransactionState::Started {
            return Err(ClientError::InvalidState(format!(
                "commit() is not valid in state {:?}",
                self.state
            )));
        }

        let ctx = self.context.take().ok_or_else(|| {
            ClientError::InvalidState("no active transaction context".to_string())
        })?;
        self.state = TransactionState::Committing;

        let request = CommitRequest {
            session: self.guard.session().clone(),
            transaction_id: ctx.transaction_id(),
            attempt: ctx.attempt(),
            mutations: ctx.take_mutations()?,
            options: self.options.clone(),
            mode: CommitMode::Transactional,
        };
        ctx.invalidate();

        match self.service.commit(request).await {
            Ok(response) => {
                self.state = TransactionState::Committed;
                Ok(response)
            }
            Err(err) => {
                let err = ClientError::from(err);
                self.state = if err.is_aborted() {
                    TransactionState::Aborted
                } else {
                    TransactionState::Failed
                };
                Err(err)
            }
        }
    }

    /// Roll back the current attempt. The remote notification is
    /// best-effort; the local state becomes [`TransactionState::RolledBack`]
    /// regardless of network outcome.
    pub async fn rollback(&mut self) -> Result<()> {
        match self.state {
            TransactionState::Started | TransactionState::Committing => {}
            other => {
                return Err(ClientError::InvalidState(format!(
                    "rollback() is not valid in state {:?}",
                    other
                )));
            }
        }

        if let Some(ctx) = self.context.take() {
            let transaction_id = ctx.transaction_id();
            ctx.invalidate();
            if let Err(err) = self
                .service
                .rollback(self.guard.session(), transaction_id)
                .await
            {
                tracing::warn!(%transaction_id, %err, "best-effort rollback failed");
            }
        }

        self.state = TransactionState::RolledBack;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDatabase, MockSessionProvider};
    use crate::rpc::RpcError;
    use meridian_common::Mutation;

    async fn manager(
        provider: &Arc<MockSessionProvider>,
        service: &Arc<MockDatabase>,
    ) -> TransactionManager<MockSessionProvider, MockDatabase> {
        let guard = SessionGuard::acquire(provider.clone()).await.unwrap();
        TransactionManager::new(service.clone(), guard, CallOptions::new())
    }

    #[tokio::test]
    async fn test_begin_commit_lifecycle() {
        let provider = Arc::new(MockSessionProvider::new("db"));
        let service = Arc::new(MockDatabase::new());
        let mut txn = manager(&provider, &service).await;

        assert_eq!(txn.state(), TransactionState::NotStarted);
        let ctx = txn.begin().unwrap();
        ctx.buffer(Mutation::insert("T").set("id", 1i64).build()).unwrap();

        let response = txn.commit().await.unwrap();
        assert_eq!(txn.state(), TransactionState::Committed);
        assert_eq!(response.mutation_count, Some(1));

        // Terminal state: no further operations.
        assert!(txn.begin().is_err());
        assert!(txn.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_commit_twice_after_abort_needs_begin() {
        let provider = Arc::new(MockSessionProvider::new("db"));
        let service = Arc::new(MockDatabase::new());
        service.fail_next_commits(1, RpcError::aborted("conflict"));

        let mut txn = manager(&provider, &service).await;
        let ctx = txn.begin().unwrap();
        ctx.buffer(Mutation::insert("T").set("id", 1i64).build()).unwrap();

        let err = txn.commit().await.unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(txn.state(), TransactionState::Aborted);

        // A second commit without begin() is a precondition failure and
        // must not reach the service.
        let before = service.commit_attempts();
        let err = txn.commit().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert_eq!(service.commit_attempts(), before);

        // Fresh attempt starts empty and must be rebuffered.
        let ctx = txn.begin().unwrap();
        assert_eq!(ctx.buffered(), 0);
        ctx.buffer(Mutation::insert("T").set("id", 1i64).build()).unwrap();
        txn.commit().await.unwrap();
        assert_eq!(txn.state(), TransactionState::Committed);
    }

    #[tokio::test]
    async fn test_rollback_is_local_success() {
        let provider = Arc::new(MockSessionProvider::new("db"));
        let service = Arc::new(MockDatabase::new());

        let mut txn = manager(&provider, &service).await;
        let ctx = txn.begin().unwrap();
        ctx.buffer(Mutation::insert("T").set("id", 1i64).build()).unwrap();

        txn.rollback().await.unwrap();
        assert_eq!(txn.state(), TransactionState::RolledBack);
        assert_eq!(service.rollback_count(), 1);
        assert!(txn.begin().is_err());
    }

    #[tokio::test]
    async fn test_non_retryable_commit_fails_terminally() {
        let provider = Arc::new(MockSessionProvider::new("db"));
        let service = Arc::new(MockDatabase::new());
        service.fail_next_commits(
            1,
            RpcError::new(meridian_common::StatusCode::PermissionDenied, "denied"),
        );

        let mut txn = manager(&provider, &service).await;
        txn.begin().unwrap();
        let err = txn.commit().await.unwrap_err();
        assert!(matches!(err, ClientError::PermissionDenied(_)));
        assert_eq!(txn.state(), TransactionState::Failed);
        assert!(txn.begin().is_err());
    }

    #[tokio::test]
    async fn test_session_released_once_on_every_outcome() {
        let provider = Arc::new(MockSessionProvider::new("db"));
        let service = Arc::new(MockDatabase::new());

        // Committed path.
        {
            let mut txn = manager(&provider, &service).await;
            txn.begin().unwrap();
            txn.commit().await.unwrap();
        }
        // Rolled-back path.
        {
            let mut txn = manager(&provider, &service).await;
            txn.begin().unwrap();
            txn.rollback().await.unwrap();
        }
        // Dropped mid-use without finishing.
        {
            let mut txn = manager(&provider, &service).await;
            txn.begin().unwrap();
        }

        assert_eq!(provider.acquired(), 3);
        assert_eq!(provider.released(), 3);
    }
}
