//! Transaction handle handed to a sea-orm session.
//!
//! The `DatabaseTransaction` lives behind a slot the client can empty at any
//! time. Once it is taken (commit, rollback or timeout) every statement
//! through the handle fails with [`ClientError::TransactionClosed`] instead of
//! reaching the database.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, ExecResult, QueryResult, Statement,
};

use crate::client::{QueryEvent, QueryListener};
use crate::error::ClientError;

const REVOKE_POLL: Duration = Duration::from_millis(10);

pub struct SessionTransaction {
    backend: DbBackend,
    txn: Mutex<Option<Arc<DatabaseTransaction>>>,
    on_query: Option<QueryListener>,
}

impl SessionTransaction {
    pub(crate) fn new(
        backend: DbBackend,
        txn: DatabaseTransaction,
        on_query: Option<QueryListener>,
    ) -> Self {
        Self {
            backend,
            txn: Mutex::new(Some(Arc::new(txn))),
            on_query,
        }
    }

    /// The live transaction, or an error once the session is over.
    pub fn current(&self) -> Result<Arc<DatabaseTransaction>, DbErr> {
        self.txn
            .lock()
            .clone()
            .ok_or_else(|| DbErr::Custom(ClientError::TransactionClosed.to_string()))
    }

    pub fn is_open(&self) -> bool {
        self.txn.lock().is_some()
    }

    /// Take the transaction away from the handle.
    ///
    /// New statements fail immediately; statements already running keep their
    /// reference until they finish, so this waits up to `grace` for them.
    /// Returns `None` if the transaction was already taken or is still shared
    /// after `grace`; in the latter case the last reference rolls it back when
    /// dropped.
    pub(crate) async fn revoke(&self, grace: Duration) -> Option<DatabaseTransaction> {
        let mut txn = self.txn.lock().take()?;
        let deadline = Instant::now() + grace;
        loop {
            match Arc::try_unwrap(txn) {
                Ok(txn) => return Some(txn),
                Err(shared) if Instant::now() < deadline => {
                    txn = shared;
                    tokio::time::sleep(REVOKE_POLL).await;
                }
                Err(_) => return None,
            }
        }
    }

    fn query_text(&self, sql: &str) -> Option<String> {
        self.on_query.as_ref().map(|_| sql.to_string())
    }

    fn record(&self, query: Option<String>, started: Instant, failed: bool) {
        if let (Some(listener), Some(query)) = (self.on_query.as_ref(), query) {
            listener(&QueryEvent {
                query,
                elapsed: started.elapsed(),
                failed,
            });
        }
    }
}

#[async_trait]
impl ConnectionTrait for SessionTransaction {
    fn get_database_backend(&self) -> DbBackend {
        self.backend
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        let txn = self.current()?;
        let query = self.query_text(&stmt.sql);
        let started = Instant::now();
        let result = txn.execute(stmt).await;
        self.record(query, started, result.is_err());
        result
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        let txn = self.current()?;
        let started = Instant::now();
        let result = txn.execute_unprepared(sql).await;
        self.record(self.query_text(sql), started, result.is_err());
        result
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        let txn = self.current()?;
        let query = self.query_text(&stmt.sql);
        let started = Instant::now();
        let result = txn.query_one(stmt).await;
        self.record(query, started, result.is_err());
        result
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        let txn = self.current()?;
        let query = self.query_text(&stmt.sql);
        let started = Instant::now();
        let result = txn.query_all(stmt).await;
        self.record(query, started, result.is_err());
        result
    }
}
