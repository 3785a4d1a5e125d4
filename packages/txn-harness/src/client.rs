//! The database client boundary.
//!
//! The harness never talks to a database directly. It drives a client through
//! [`TransactionalClient`]: connect once, run one transaction body per
//! session, and report the statements run through that session's handle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::config::HarnessOptions;
use crate::error::ClientError;

/// Bounds applied to a single transaction.
#[derive(Clone)]
pub struct TransactionOptions {
    /// How long to wait for the backend to hand out a transaction.
    pub max_wait: Duration,
    /// How long the transaction body may run before the backend aborts it.
    pub timeout: Duration,
    /// Receives every statement run through this transaction's handle, and
    /// nothing else on the client.
    pub on_query: Option<QueryListener>,
}

impl fmt::Debug for TransactionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionOptions")
            .field("max_wait", &self.max_wait)
            .field("timeout", &self.timeout)
            .field("on_query", &self.on_query.is_some())
            .finish()
    }
}

/// Returned by a transaction body to request a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAbort {
    Rollback,
}

/// A transaction body. It receives the transaction-scoped handle and decides
/// the outcome: `Ok(())` commits, `Err(TransactionAbort)` rolls back.
pub type TransactionBody<T> =
    Box<dyn FnOnce(Arc<T>) -> BoxFuture<'static, Result<(), TransactionAbort>> + Send>;

/// One executed statement, as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
    pub query: String,
    pub elapsed: Duration,
    pub failed: bool,
}

impl QueryEvent {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            elapsed: Duration::ZERO,
            failed: false,
        }
    }
}

/// Callback invoked synchronously, in execution order, for every statement.
pub type QueryListener = Arc<dyn Fn(&QueryEvent) + Send + Sync>;

/// A database client able to hold a transaction open across awaits.
#[async_trait]
pub trait TransactionalClient: Send + Sync + 'static {
    /// The transaction-scoped handle handed to transaction bodies.
    type Transaction: Send + Sync + 'static;

    /// Whether transactions can be held open by application code.
    fn supports_interactive_transactions(&self) -> bool;

    async fn connect(&self) -> Result<(), ClientError>;

    async fn disconnect(&self) -> Result<(), ClientError>;

    /// Run `body` inside one transaction.
    ///
    /// Implementations must fail with [`ClientError::MaxWaitExceeded`] when no
    /// transaction is available within `options.max_wait`, roll back and fail
    /// with [`ClientError::TimeoutExceeded`] when the body outlives
    /// `options.timeout`, commit when the body returns `Ok(())`, and roll back
    /// and return [`ClientError::RolledBack`] when it returns an abort.
    ///
    /// Once the transaction is finished, for whatever reason, the handle given
    /// to the body must stop reaching the database.
    async fn run_in_transaction(
        &self,
        options: TransactionOptions,
        body: TransactionBody<Self::Transaction>,
    ) -> Result<(), ClientError>;
}

/// Builds clients for the shared client registry.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: TransactionalClient;

    /// Name matched against `client_module_path`.
    fn name(&self) -> &str;

    /// Create an unconnected client for the given options.
    async fn create(&self, options: &HarnessOptions) -> Result<Self::Client, ClientError>;
}
