//! Database sessions and the provider seam
//!
//! The core never manages pooling itself; it borrows sessions from a
//! [`SessionProvider`] and returns them through [`SessionGuard`], which
//! releases exactly once on drop, on every path.

use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A borrowed session bound to one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    database: String,
}

impl Session {
    pub fn new(id: SessionId, database: impl Into<String>) -> Self {
        Self { id, database: database.into() }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The database identity this session is bound to.
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// External collaborator that hands out sessions.
pub trait SessionProvider: Send + Sync + 'static {
    /// Borrow a session bound to this provider's database.
    fn acquire(&self) -> impl Future<Output = Result<Session>> + Send;

    /// Return a previously acquired session. Must be safe to call from drop
    /// paths, so it is synchronous and infallible.
    fn release(&self, session: Session);
}

/// Scoped session ownership: releases the session back to its provider
/// exactly once when dropped.
pub struct SessionGuard<P: SessionProvider> {
    provider: Arc<P>,
    session: Option<Session>,
}

impl<P: SessionProvider> SessionGuard<P> {
    /// Borrow a session from the provider.
    pub async fn acquire(provider: Arc<P>) -> Result<Self> {
        let session = provider.acquire().await?;
        Ok(Self { provider, session: Some(session) })
    }

    /// The held session.
    pub fn session(&self) -> &Session {
        // Some until drop
        self.session.as_ref().unwrap()
    }
}

impl<P: SessionProvider> Drop for SessionGuard<P> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.provider.release(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSessionProvider;

    #[tokio::test]
    async fn test_guard_releases_exactly_once() {
        let provider = Arc::new(MockSessionProvider::new("projects/p/databases/d"));
        {
            let guard = SessionGuard::acquire(provider.clone()).await.unwrap();
            assert_eq!(guard.session().database(), "projects/p/databases/d");
            assert_eq!(provider.active_sessions(), 1);
        }
        assert_eq!(provider.acquired(), 1);
        assert_eq!(provider.released(), 1);
        assert_eq!(provider.active_sessions(), 0);
    }
}
