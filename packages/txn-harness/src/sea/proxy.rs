//! sea-orm capability surface for [`TxClient`].
//!
//! Lets a session proxy go anywhere a sea-orm connection is accepted.
//! Statement execution forwards to the session's [`SessionTransaction`].
//! `transaction` callbacks run in place against the live
//! `DatabaseTransaction`; `begin` would need a real nested transaction and
//! is refused.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, ExecResult,
    IsolationLevel, QueryResult, Statement, TransactionError, TransactionTrait,
};

use crate::error::ClientError;
use crate::proxy::TxClient;
use crate::sea::session::SessionTransaction;

fn unsupported(name: &str) -> DbErr {
    DbErr::Custom(ClientError::unsupported(name).to_string())
}

#[async_trait]
impl ConnectionTrait for TxClient<SessionTransaction> {
    fn get_database_backend(&self) -> DbBackend {
        self.handle().get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.handle().execute(stmt).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.handle().execute_unprepared(sql).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.handle().query_one(stmt).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.handle().query_all(stmt).await
    }

}

#[async_trait]
impl TransactionTrait for TxClient<SessionTransaction> {
    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        Err(unsupported("begin"))
    }

    async fn begin_with_config(
        &self,
        _isolation_level: Option<IsolationLevel>,
        _access_mode: Option<AccessMode>,
    ) -> Result<DatabaseTransaction, DbErr> {
        Err(unsupported("begin_with_config"))
    }

    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let txn = self.handle().current().map_err(TransactionError::Connection)?;
        callback(txn.as_ref())
            .await
            .map_err(TransactionError::Transaction)
    }

    async fn transaction_with_config<F, T, E>(
        &self,
        callback: F,
        _isolation_level: Option<IsolationLevel>,
        _access_mode: Option<AccessMode>,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let txn = self.handle().current().map_err(TransactionError::Connection)?;
        callback(txn.as_ref())
            .await
            .map_err(TransactionError::Transaction)
    }
}
