//! Database client facade
//!
//! [`DatabaseClient`] composes the session provider and remote service into
//! the public write surface: read-write transactions, manual transaction
//! managers, and the non-interactive write paths. Dependencies are injected
//! at construction; there is no ambient global state.

use crate::error::Result;
use crate::executor::{BatchWriteStream, WriteExecutor};
use crate::manager::TransactionManager;
use crate::rpc::DatabaseService;
use crate::runner::{RetryPolicy, TransactionRunner};
use crate::session::{SessionGuard, SessionProvider};
use meridian_common::{
    CallOptions, CommitResponse, Mutation, MutationGroup, Statement,
};
use std::sync::Arc;

/// Client-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Retry policy applied to read-write transactions and `write`.
    pub retry: RetryPolicy,
}

/// Facade over one database: owns session acquisition and exposes the write
/// entry points.
pub struct DatabaseClient<P: SessionProvider, S: DatabaseService> {
    sessions: Arc<P>,
    service: Arc<S>,
    config: ClientConfig,
}

impl<P: SessionProvider, S: DatabaseService> DatabaseClient<P, S> {
    pub fn new(sessions: Arc<P>, service: Arc<S>) -> Self {
        Self::with_config(sessions, service, ClientConfig::default())
    }

    pub fn with_config(sessions: Arc<P>, service: Arc<S>, config: ClientConfig) -> Self {
        Self { sessions, service, config }
    }

    /// A runner for one read-write transaction carrying the given options.
    ///
    /// ```ignore
    /// let (rows, _) = client
    ///     .read_write_transaction(CallOptions::exclude_txn_from_change_streams())
    ///     .run(|txn| async move {
    ///         txn.execute_update(Statement::of("UPDATE ...")).await
    ///     })
    ///     .await?;
    /// ```
    pub fn read_write_transaction(&self, options: CallOptions) -> TransactionRunner<P, S> {
        TransactionRunner::new(
            self.sessions.clone(),
            self.service.clone(),
            self.config.retry.clone(),
            options,
        )
    }

    /// A manual transaction manager carrying the given options. Acquires
    /// the manager's session; the session is released when the manager is
    /// dropped.
    pub async fn transaction_manager(
        &self,
        options: CallOptions,
    ) -> Result<TransactionManager<P, S>> {
        let guard = SessionGuard::acquire(self.sessions.clone()).await?;
        Ok(TransactionManager::new(self.service.clone(), guard, options))
    }

    /// Apply mutations in one implicit read-write transaction.
    pub async fn write(
        &self,
        mutations: Vec<Mutation>,
        options: CallOptions,
    ) -> Result<CommitResponse> {
        self.executor().write(mutations, options).await
    }

    /// Apply mutations with a single commit attempt and no abort retry.
    pub async fn write_at_least_once(
        &self,
        mutations: Vec<Mutation>,
        options: CallOptions,
    ) -> Result<CommitResponse> {
        self.executor().write_at_least_once(mutations, options).await
    }

    /// Apply mutation groups non-atomically across groups, yielding
    /// per-group results as they complete.
    pub async fn batch_write_at_least_once(
        &self,
        groups: Vec<MutationGroup>,
        options: CallOptions,
    ) -> Result<BatchWriteStream<P>> {
        self.executor().batch_write_at_least_once(groups, options).await
    }

    /// Execute a partitioned DML statement, returning a lower-bound
    /// affected-row count.
    pub async fn partitioned_update(
        &self,
        statement: Statement,
        options: CallOptions,
    ) -> Result<u64> {
        self.executor().partitioned_update(statement, options).await
    }

    fn executor(&self) -> WriteExecutor<P, S> {
        WriteExecutor::new(
            self.sessions.clone(),
            self.service.clone(),
            self.config.retry.clone(),
        )
    }
}
