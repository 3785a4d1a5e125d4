//! Client access proxy.
//!
//! [`TxClient`] stands in for the database client while a session is open.
//! Every capability of the transaction-scoped handle is reachable through
//! `Deref`; the client's own "run as a transaction" capability is redefined
//! to run in place against the current transaction, because the backends the
//! harness drives cannot nest real transactions.
//!
//! [`ClientSlot`] is the handle injected into test code. It reads whichever
//! proxy the delegate has published for the current session.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

/// Proxy bound to one transaction session.
pub struct TxClient<T> {
    tx: Arc<T>,
}

impl<T> Clone for TxClient<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Deref for TxClient<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.tx
    }
}

impl<T> TxClient<T> {
    pub fn new(tx: Arc<T>) -> Self {
        Self { tx }
    }

    /// The transaction-scoped handle this proxy forwards to.
    pub fn handle(&self) -> &Arc<T> {
        &self.tx
    }

    /// Run `callback` against the current transaction.
    ///
    /// No transaction is opened; the callback receives the session's own
    /// handle and its error is returned as-is.
    pub async fn in_transaction<F, Fut, R, E>(&self, callback: F) -> Result<R, E>
    where
        F: FnOnce(Arc<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        callback(Arc::clone(&self.tx)).await
    }

    /// Run independent operations against the current transaction.
    ///
    /// Operations are awaited one at a time in input order, so later ones
    /// observe the effects of earlier ones. Results come back in the same
    /// order; the first error stops the batch.
    pub async fn batch<I, Fut, R, E>(&self, operations: I) -> Result<Vec<R>, E>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<R, E>>,
    {
        let operations = operations.into_iter();
        let mut results = Vec::with_capacity(operations.size_hint().0);
        for operation in operations {
            results.push(operation.await?);
        }
        Ok(results)
    }
}

/// Injected access point for the current session's proxy.
pub struct ClientSlot<T> {
    current: Arc<RwLock<Option<TxClient<T>>>>,
}

impl<T> Clone for ClientSlot<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<T> Default for ClientSlot<T> {
    fn default() -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
        }
    }
}

impl<T> ClientSlot<T> {
    /// The proxy for the open session.
    ///
    /// Before a session starts this logs a warning and returns `None`;
    /// outer-scope setup should use `original_client` instead.
    pub fn get(&self) -> Option<TxClient<T>> {
        let current = self.current.read().clone();
        if current.is_none() {
            warn!(
                "client used before its transaction started; use it inside a test body or per-test setup"
            );
            warn!("for suite-level setup or teardown, use original_client instead");
        }
        current
    }

    /// Whether a session is currently published. Does not warn.
    pub fn is_active(&self) -> bool {
        self.current.read().is_some()
    }

    pub(crate) fn publish(&self, client: TxClient<T>) {
        *self.current.write() = Some(client);
    }

    pub(crate) fn clear(&self) -> Option<TxClient<T>> {
        self.current.write().take()
    }
}
