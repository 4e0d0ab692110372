//! Single-attempt transaction state
//!
//! A [`TransactionContext`] is the mutable state of exactly one transaction
//! attempt: an append-only mutation buffer plus the session handle the
//! attempt runs against. Contexts are cheap to clone (Arc-backed) so user
//! closures can move them into async blocks, but each context belongs to
//! one attempt only: when the attempt ends the context is invalidated and
//! any further use fails with a state error instead of silently buffering.

use crate::error::{ClientError, Result};
use crate::rpc::{DatabaseService, TransactionId};
use crate::session::Session;
use meridian_common::{Mutation, Statement};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct ContextInner<S: DatabaseService> {
    service: Arc<S>,
    session: Session,
    transaction_id: TransactionId,
    attempt: u64,
    buffer: Mutex<Vec<Mutation>>,
    active: AtomicBool,
}

/// The state of one transaction attempt.
pub struct TransactionContext<S: DatabaseService> {
    inner: Arc<ContextInner<S>>,
}

impl<S: DatabaseService> Clone for TransactionContext<S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S: DatabaseService> TransactionContext<S> {
    pub(crate) fn new(service: Arc<S>, session: Session, attempt: u64) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                service,
                session,
                transaction_id: TransactionId::generate(),
                attempt,
                buffer: Mutex::new(Vec::new()),
                active: AtomicBool::new(true),
            }),
        }
    }

    /// The attempt sequence number, starting at 1.
    pub fn attempt(&self) -> u64 {
        self.inner.attempt
    }

    /// The id of this attempt.
    pub fn transaction_id(&self) -> TransactionId {
        self.inner.transaction_id
    }

    /// Append a mutation to this attempt's buffer. The mutation takes
    /// effect only if this attempt commits.
    pub fn buffer(&self, mutation: Mutation) -> Result<()> {
        self.ensure_active()?;
        self.inner.buffer.lock().push(mutation);
        Ok(())
    }

    /// Append several mutations, preserving order.
    pub fn buffer_many(&self, mutations: impl IntoIterator<Item = Mutation>) -> Result<()> {
        self.ensure_active()?;
        self.inner.buffer.lock().extend(mutations);
        Ok(())
    }

    /// Number of mutations buffered so far.
    pub fn buffered(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// Execute a DML statement inside this attempt, returning affected
    /// rows. An `Aborted` failure here is retryable by the runner like an
    /// aborted commit.
    pub async fn execute_update(&self, statement: Statement) -> Result<u64> {
        self.ensure_active()?;
        self.inner
            .service
            .execute_update(&self.inner.session, self.inner.transaction_id, statement)
            .await
            .map_err(ClientError::from)
    }

    /// Drain the buffer for commit.
    pub(crate) fn take_mutations(&self) -> Result<Vec<Mutation>> {
        self.ensure_active()?;
        Ok(std::mem::take(&mut *self.inner.buffer.lock()))
    }

    /// Mark the attempt as finished. Buffered state is discarded; later
    /// calls through any clone of this context fail.
    pub(crate) fn invalidate(&self) {
        self.inner.active.store(false, Ordering::Release);
        self.inner.buffer.lock().clear();
    }

    fn ensure_active(&self) -> Result<()> {
        if self.inner.active.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ClientError::InvalidState(format!(
                "transaction attempt {} has already ended",
                self.inner.attempt
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDatabase;
    use meridian_common::Mutation;

    fn test_session() -> Session {
        Session::new(crate::session::SessionId::generate(), "db")
    }

    #[test]
    fn test_buffer_preserves_order() {
        let service = Arc::new(MockDatabase::new());
        let ctx = TransactionContext::new(service, test_session(), 1);

        ctx.buffer(Mutation::insert("T").set("id", 1i64).build()).unwrap();
        ctx.buffer(Mutation::update("T").set("id", 1i64).build()).unwrap();
        assert_eq!(ctx.buffered(), 2);

        let drained = ctx.take_mutations().unwrap();
        assert_eq!(drained[0].table(), "T");
        assert_eq!(drained.len(), 2);
        assert_eq!(ctx.buffered(), 0);
    }

    #[test]
    fn test_invalidated_context_rejects_buffering() {
        let service = Arc::new(MockDatabase::new());
        let ctx = TransactionContext::new(service, test_session(), 1);
        let stale = ctx.clone();

        ctx.buffer(Mutation::insert("T").set("id", 1i64).build()).unwrap();
        ctx.invalidate();

        let err = stale
            .buffer(Mutation::insert("T").set("id", 2i64).build())
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        // Discarding the attempt leaves no observable buffered state.
        assert_eq!(stale.buffered(), 0);
    }
}
