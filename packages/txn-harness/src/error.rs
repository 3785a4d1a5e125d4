use std::time::Duration;

use sea_orm::DbErr;
use thiserror::Error;

/// Errors raised by a [`TransactionalClient`](crate::client::TransactionalClient)
/// implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection error: {message}")]
    Connection { message: String },
    #[error("Client is not connected")]
    NotConnected,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Timed out after {waited:?} waiting for a transaction")]
    MaxWaitExceeded { waited: Duration },
    #[error("Transaction exceeded its {timeout:?} timeout and was rolled back")]
    TimeoutExceeded { timeout: Duration },
    #[error("Transaction was rolled back")]
    RolledBack,
    #[error("Transaction handle is still referenced outside the session")]
    TransactionInUse,
    #[error("Transaction has already finished; the session that owned it is over")]
    TransactionClosed,
    #[error("Unsupported property: {name}")]
    UnsupportedProperty { name: String },
}

impl ClientError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::UnsupportedProperty { name: name.into() }
    }
}

/// Errors raised by the lifecycle delegate and its supporting pieces.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error(
        "Client '{client}' does not support interactive transactions; \
         per-test transactions cannot be provided"
    )]
    InteractiveTransactionsUnsupported { client: String },
    #[error("A transaction session is already open for scope '{scope}'")]
    SessionAlreadyOpen { scope: String },
    #[error("Transaction did not start within {waited:?}")]
    MaxWaitExceeded { waited: Duration },
    #[error("Transaction finished before the session became ready")]
    TransactionNotStarted,
    #[error("Transaction task failed: {detail}")]
    SessionTask { detail: String },
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl HarnessError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
