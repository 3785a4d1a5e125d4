//! Transaction lifecycle delegate.
//!
//! Reacts to test-runner lifecycle events by opening one transaction session
//! per test (or per grouped suite) and ending it at the matching close. The
//! session's transaction body runs on its own task and stays parked on a
//! oneshot until the end event says how to finish: commit when rollback is
//! disabled, rollback otherwise. The test's own outcome never decides.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::client::{
    ClientFactory, TransactionAbort, TransactionBody, TransactionalClient,
};
use crate::config::HarnessOptions;
use crate::error::{ClientError, HarnessError};
use crate::lifecycle::LifecycleEvent;
use crate::proxy::{ClientSlot, TxClient};
use crate::query_log::{QueryLogBuffer, QueryLogSink, TracingQueryLog};
use crate::scope::{ScopeId, ScopeTree};
use crate::shared_clients::{ClientKey, SharedClients};

/// How a session's transaction is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Commit,
    Rollback,
}

/// Values injected into test code.
pub struct TestContext<C: TransactionalClient> {
    /// Proxy for the open session; `None` (with a warning) outside one.
    pub client: ClientSlot<C::Transaction>,
    /// The shared client itself, usable at any time.
    pub original_client: Arc<C>,
}

impl<C: TransactionalClient> Clone for TestContext<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            original_client: Arc::clone(&self.original_client),
        }
    }
}

struct ActiveSession {
    scope: ScopeId,
    scope_name: String,
    completion: oneshot::Sender<SessionOutcome>,
    task: JoinHandle<Result<(), ClientError>>,
}

pub struct TransactionDelegate<C: TransactionalClient> {
    options: HarnessOptions,
    registry: Arc<SharedClients<C>>,
    key: ClientKey,
    client: Arc<C>,
    slot: ClientSlot<C::Transaction>,
    session: Option<ActiveSession>,
    log_buffer: QueryLogBuffer,
    sink: Arc<dyn QueryLogSink>,
    test_path: String,
}

impl<C: TransactionalClient> TransactionDelegate<C> {
    /// Acquire the shared client and check it can hold transactions open.
    ///
    /// A client without interactive transactions is a fatal setup error: no
    /// test in the file can be isolated.
    pub async fn initialize<F>(
        options: HarnessOptions,
        registry: Arc<SharedClients<C>>,
        factory: &F,
        test_path: impl Into<String>,
    ) -> Result<Self, HarnessError>
    where
        F: ClientFactory<Client = C>,
    {
        if let Some(requested) = options.client_module_path.as_deref() {
            if requested != factory.name() {
                return Err(HarnessError::config(format!(
                    "client '{requested}' is not available; this delegate was built with '{}'",
                    factory.name()
                )));
            }
        }

        let (key, client) = registry.acquire(&options, factory).await?;

        if !client.supports_interactive_transactions() {
            error!(
                client = factory.name(),
                "database client does not support interactive transactions"
            );
            registry.release(&key).await?;
            return Err(HarnessError::InteractiveTransactionsUnsupported {
                client: factory.name().to_string(),
            });
        }

        let test_path = test_path.into();
        debug!(delegate = "initialized", test_path = %test_path);

        Ok(Self {
            options,
            registry,
            key,
            client,
            slot: ClientSlot::default(),
            session: None,
            log_buffer: QueryLogBuffer::new(),
            sink: Arc::new(TracingQueryLog),
            test_path,
        })
    }

    /// Replace the destination of verbose query lines.
    pub fn with_query_log_sink(mut self, sink: Arc<dyn QueryLogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn prepare_test_context(&self) -> TestContext<C> {
        TestContext {
            client: self.slot.clone(),
            original_client: Arc::clone(&self.client),
        }
    }

    /// React to one lifecycle event.
    ///
    /// Errors returned from start and end events mean the session could not
    /// be opened or did not finish cleanly; the runner should fail the test.
    pub async fn handle_event(
        &mut self,
        tree: &ScopeTree,
        event: LifecycleEvent,
    ) -> Result<(), HarnessError> {
        debug!(event = event.name(), scope = %event.scope());
        match event {
            LifecycleEvent::SuiteStart(id) => {
                if !self.owns_suite_session(tree, id) {
                    return Ok(());
                }
                self.begin_session(tree, id).await
            }
            LifecycleEvent::TestStart(id) => {
                if tree.is_grouped(id) {
                    debug!(session = "reuse_group", scope = %tree.name(id));
                    return Ok(());
                }
                self.begin_session(tree, id).await
            }
            LifecycleEvent::SuiteEnd(id) => {
                if !self.owns_suite_session(tree, id) {
                    return Ok(());
                }
                self.end_session().await
            }
            LifecycleEvent::TestDone(id) | LifecycleEvent::TestSkip(id) => {
                if tree.is_grouped(id) {
                    return Ok(());
                }
                self.end_session().await
            }
            LifecycleEvent::TestFnStart(_) => {
                self.log_buffer.start();
                Ok(())
            }
            LifecycleEvent::TestFnSuccess(id) | LifecycleEvent::TestFnFailure(id) => {
                let events = self.log_buffer.take();
                if self.options.verbose_query {
                    if let Some(events) = events {
                        let breadcrumb = tree.breadcrumb(&self.test_path, id);
                        for event in &events {
                            self.sink.emit(&breadcrumb, event);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Only grouped suites outside any other group own a session; plain
    /// suites leave isolation to their tests.
    fn owns_suite_session(&self, tree: &ScopeTree, id: ScopeId) -> bool {
        tree.node(id).grouped && !tree.is_grouped(id)
    }

    async fn begin_session(&mut self, tree: &ScopeTree, id: ScopeId) -> Result<(), HarnessError> {
        if let Some(open) = self.session.as_ref() {
            warn!(
                "session=begin_rejected scope={} open_scope={} open_id={}",
                tree.name(id),
                open.scope_name,
                open.scope
            );
            return Err(HarnessError::SessionAlreadyOpen {
                scope: open.scope_name.clone(),
            });
        }

        let (ready_tx, ready_rx) = oneshot::channel::<TxClient<C::Transaction>>();
        let (completion_tx, completion_rx) = oneshot::channel::<SessionOutcome>();

        let body: TransactionBody<C::Transaction> = Box::new(
            move |tx: Arc<C::Transaction>| -> BoxFuture<'static, Result<(), TransactionAbort>> {
                Box::pin(async move {
                    // Nobody is waiting for this session any more.
                    if ready_tx.send(TxClient::new(tx)).is_err() {
                        return Err(TransactionAbort::Rollback);
                    }
                    match completion_rx.await {
                        Ok(SessionOutcome::Commit) => Ok(()),
                        Ok(SessionOutcome::Rollback) | Err(_) => Err(TransactionAbort::Rollback),
                    }
                })
            },
        );

        let client = Arc::clone(&self.client);
        let mut tx_options = self.options.transaction_options();
        if self.options.verbose_query {
            tx_options.on_query = Some(self.log_buffer.listener());
        }
        let task = tokio::spawn(async move { client.run_in_transaction(tx_options, body).await });

        match tokio::time::timeout(self.options.max_wait, ready_rx).await {
            Ok(Ok(proxy)) => {
                self.slot.publish(proxy);
                self.session = Some(ActiveSession {
                    scope: id,
                    scope_name: tree.name(id).to_string(),
                    completion: completion_tx,
                    task,
                });
                debug!(session = "begin", scope = %tree.name(id));
                Ok(())
            }
            Ok(Err(_)) => {
                let err = failed_start(task).await;
                warn!("session=begin_failed scope={} error={}", tree.name(id), err);
                Err(err)
            }
            Err(_) => {
                task.abort();
                warn!(
                    "session=begin_timed_out scope={} max_wait_ms={}",
                    tree.name(id),
                    self.options.max_wait.as_millis()
                );
                Err(HarnessError::MaxWaitExceeded {
                    waited: self.options.max_wait,
                })
            }
        }
    }

    async fn end_session(&mut self) -> Result<(), HarnessError> {
        let Some(session) = self.session.take() else {
            debug!(session = "end_skipped", reason = "no_open_session");
            return Ok(());
        };

        self.slot.clear();

        let outcome = if self.options.disable_rollback {
            SessionOutcome::Commit
        } else {
            SessionOutcome::Rollback
        };
        if session.completion.send(outcome).is_err() {
            debug!(
                session = "body_already_finished",
                scope = %session.scope_name
            );
        }

        match session.task.await {
            Ok(Ok(())) => {
                debug!(session = "committed", scope = %session.scope_name);
                Ok(())
            }
            Ok(Err(ClientError::RolledBack)) if outcome == SessionOutcome::Rollback => {
                debug!(session = "rolled_back", scope = %session.scope_name);
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("session=end_failed scope={} error={}", session.scope_name, e);
                Err(e.into())
            }
            Err(e) => Err(HarnessError::SessionTask {
                detail: e.to_string(),
            }),
        }
    }

    /// End any session left open, then give up this delegate's share of the
    /// client. The last delegate out disconnects it.
    pub async fn teardown(mut self) -> Result<(), HarnessError> {
        let dangling = if self.session.is_some() {
            warn!(session = "dangling_at_teardown");
            self.end_session().await
        } else {
            Ok(())
        };

        self.registry.release(&self.key).await?;
        dangling
    }
}

/// The readiness signal was dropped: the client gave up before running the
/// body. Its task result says why.
async fn failed_start(task: JoinHandle<Result<(), ClientError>>) -> HarnessError {
    match task.await {
        Ok(Err(e)) => HarnessError::Client(e),
        Ok(Ok(())) => HarnessError::TransactionNotStarted,
        Err(e) => HarnessError::SessionTask {
            detail: e.to_string(),
        },
    }
}
