//! Per-test database transactions for test runners.
//!
//! A [`TransactionDelegate`] listens to a runner's lifecycle events and
//! wraps every test (or every grouped suite) in a database transaction that
//! is rolled back when the scope ends, so tests can write freely to a shared
//! database without seeing each other's data.
//!
//! Test code reaches the database through a [`TestContext`]: `client` is a
//! proxy bound to the open transaction, `original_client` is the shared
//! client for suite-level setup outside any transaction.

pub mod client;
pub mod config;
pub mod delegate;
pub mod error;
pub mod lifecycle;
pub mod proxy;
pub mod query_log;
pub mod runner;
pub mod scope;
pub mod sea;
pub mod shared_clients;

pub use client::{
    ClientFactory, QueryEvent, QueryListener, TransactionAbort, TransactionBody,
    TransactionOptions, TransactionalClient,
};
pub use config::HarnessOptions;
pub use delegate::{SessionOutcome, TestContext, TransactionDelegate};
pub use error::{ClientError, HarnessError};
pub use lifecycle::LifecycleEvent;
pub use proxy::{ClientSlot, TxClient};
pub use query_log::{MemoryQueryLog, QueryLogSink, TracingQueryLog};
pub use runner::{run_test, skip_test, TestFailure};
pub use scope::{ScopeId, ScopeTree};
pub use shared_clients::{ClientKey, SharedClients};
