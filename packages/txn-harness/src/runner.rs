//! Drive the lifecycle events for a single test.
//!
//! A runner integration can call [`TransactionDelegate::handle_event`]
//! directly; these helpers emit the usual sequence around an async body for
//! runners (and tests) that just want to execute one test at a time.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;

use crate::client::TransactionalClient;
use crate::delegate::{TestContext, TransactionDelegate};
use crate::error::HarnessError;
use crate::lifecycle::LifecycleEvent;
use crate::scope::{ScopeId, ScopeTree};

#[derive(Debug, Error)]
pub enum TestFailure<E> {
    #[error("test body failed: {0}")]
    Body(E),
    #[error(transparent)]
    Harness(#[from] HarnessError),
}

/// Run `body` as the test `test`: start, body start, body, body end, done.
///
/// A session that cannot be opened fails the test before the body runs. A
/// session that fails to finish (for example, it outlived its timeout) is
/// reported in preference to the body's own error, since it usually explains
/// it. A panicking body still gets its end events before the panic resumes.
pub async fn run_test<C, F, Fut, E>(
    delegate: &mut TransactionDelegate<C>,
    tree: &ScopeTree,
    test: ScopeId,
    body: F,
) -> Result<(), TestFailure<E>>
where
    C: TransactionalClient,
    F: FnOnce(TestContext<C>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    delegate
        .handle_event(tree, LifecycleEvent::TestStart(test))
        .await?;
    delegate
        .handle_event(tree, LifecycleEvent::TestFnStart(test))
        .await?;

    let outcome = AssertUnwindSafe(body(delegate.prepare_test_context()))
        .catch_unwind()
        .await;

    let fn_end = match &outcome {
        Ok(Ok(())) => LifecycleEvent::TestFnSuccess(test),
        _ => LifecycleEvent::TestFnFailure(test),
    };
    let fn_end_result = delegate.handle_event(tree, fn_end).await;
    let done = delegate
        .handle_event(tree, LifecycleEvent::TestDone(test))
        .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(panic) => std::panic::resume_unwind(panic),
    };

    fn_end_result?;
    done?;
    outcome.map_err(TestFailure::Body)
}

/// Emit the events of a test that is skipped after starting.
pub async fn skip_test<C: TransactionalClient>(
    delegate: &mut TransactionDelegate<C>,
    tree: &ScopeTree,
    test: ScopeId,
) -> Result<(), HarnessError> {
    delegate
        .handle_event(tree, LifecycleEvent::TestStart(test))
        .await?;
    delegate
        .handle_event(tree, LifecycleEvent::TestSkip(test))
        .await
}
