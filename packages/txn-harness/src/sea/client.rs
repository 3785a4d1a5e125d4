use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, ExecResult,
    QueryResult, Statement, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::client::{ClientFactory, TransactionBody, TransactionOptions, TransactionalClient};
use crate::config::HarnessOptions;
use crate::error::ClientError;
use crate::sea::session::SessionTransaction;

/// Fallback connection URL variable when no `connection_url` option is set.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Name matched against the `client_module_path` option.
pub const SEA_ORM_CLIENT: &str = "sea-orm";

/// Mask the password in a connection URL for logging.
pub fn sanitize_db_url(url: &str) -> String {
    let Some((auth_part, host_part)) = url.rsplit_once('@') else {
        return url.to_string();
    };
    let Some((scheme, _)) = auth_part.split_once("://") else {
        return url.to_string();
    };
    let credentials = &auth_part[scheme.len() + 3..];
    match credentials.split_once(':') {
        Some((user, _password)) => format!("{scheme}://{user}:***@{host_part}"),
        None => url.to_string(),
    }
}

fn backend_for_url(url: &str) -> Result<DbBackend, ClientError> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(DbBackend::Postgres)
    } else if url.starts_with("sqlite:") {
        Ok(DbBackend::Sqlite)
    } else {
        Err(ClientError::connection(format!(
            "unsupported database URL scheme: {}",
            sanitize_db_url(url)
        )))
    }
}

/// [`TransactionalClient`] over a sea-orm connection pool.
///
/// Sessions get a [`SessionTransaction`], which reports its own statements to
/// the session's query listener and stops working once the transaction is
/// finished.
pub struct SeaOrmClient {
    url: String,
    backend: DbBackend,
    conn: RwLock<Option<DatabaseConnection>>,
}

impl SeaOrmClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let url = url.into();
        let backend = backend_for_url(&url)?;
        Ok(Self {
            url,
            backend,
            conn: RwLock::new(None),
        })
    }

    /// The underlying pool, once connected.
    pub fn connection(&self) -> Result<DatabaseConnection, ClientError> {
        self.conn.read().clone().ok_or(ClientError::NotConnected)
    }

    fn db(&self) -> Result<DatabaseConnection, DbErr> {
        self.connection()
            .map_err(|e| DbErr::Custom(e.to_string()))
    }
}

#[async_trait]
impl TransactionalClient for SeaOrmClient {
    type Transaction = SessionTransaction;

    fn supports_interactive_transactions(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<(), ClientError> {
        if self.conn.read().is_some() {
            return Ok(());
        }

        let mut opt = ConnectOptions::new(self.url.clone());
        opt.sqlx_logging(false);

        let conn = Database::connect(opt).await.map_err(|e| {
            ClientError::connection(format!(
                "failed to connect to {}: {e}",
                sanitize_db_url(&self.url)
            ))
        })?;

        info!(
            "client=connected backend={:?} url={}",
            self.backend,
            sanitize_db_url(&self.url)
        );
        *self.conn.write() = Some(conn);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        let conn = self.conn.write().take();
        if let Some(conn) = conn {
            conn.close().await?;
            info!("client=disconnected url={}", sanitize_db_url(&self.url));
        }
        Ok(())
    }

    async fn run_in_transaction(
        &self,
        options: TransactionOptions,
        body: TransactionBody<SessionTransaction>,
    ) -> Result<(), ClientError> {
        let conn = self.connection()?;

        let txn = match tokio::time::timeout(options.max_wait, conn.begin()).await {
            Ok(txn) => txn?,
            Err(_) => {
                return Err(ClientError::MaxWaitExceeded {
                    waited: options.max_wait,
                })
            }
        };
        let session = Arc::new(SessionTransaction::new(
            self.backend,
            txn,
            options.on_query.clone(),
        ));

        let result = tokio::time::timeout(options.timeout, body(Arc::clone(&session))).await;

        let Ok(result) = result else {
            match session.revoke(options.max_wait).await {
                Some(txn) => txn.rollback().await?,
                None => warn!(transaction = "rollback_on_drop", reason = "still_in_use"),
            }
            debug!(transaction = "timed_out", timeout_ms = options.timeout.as_millis() as u64);
            return Err(ClientError::TimeoutExceeded {
                timeout: options.timeout,
            });
        };

        let txn = session
            .revoke(options.max_wait)
            .await
            .ok_or(ClientError::TransactionInUse)?;
        match result {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(_) => {
                txn.rollback().await?;
                Err(ClientError::RolledBack)
            }
        }
    }
}

#[async_trait]
impl ConnectionTrait for SeaOrmClient {
    fn get_database_backend(&self) -> DbBackend {
        self.backend
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.db()?.execute(stmt).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.db()?.execute_unprepared(sql).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.db()?.query_one(stmt).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.db()?.query_all(stmt).await
    }
}

/// Builds [`SeaOrmClient`]s from harness options.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeaOrmFactory;

#[async_trait]
impl ClientFactory for SeaOrmFactory {
    type Client = SeaOrmClient;

    fn name(&self) -> &str {
        SEA_ORM_CLIENT
    }

    async fn create(&self, options: &HarnessOptions) -> Result<SeaOrmClient, ClientError> {
        let url = match options.connection_url.clone() {
            Some(url) => url,
            None => env::var(DATABASE_URL_ENV).map_err(|_| {
                ClientError::connection(format!(
                    "no connection URL: set the connectionUrl option or {DATABASE_URL_ENV}"
                ))
            })?,
        };
        SeaOrmClient::new(url)
    }
}
