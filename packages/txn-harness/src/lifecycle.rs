use crate::scope::ScopeId;

/// Test-runner lifecycle events consumed by the delegate, in the order a
/// runner emits them for each scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Opens a session only for a grouped suite outside any other group;
    /// plain suites leave sessions to their tests.
    SuiteStart(ScopeId),
    SuiteEnd(ScopeId),
    TestStart(ScopeId),
    /// The test finished, whatever its outcome.
    TestDone(ScopeId),
    /// The test was skipped after its start event.
    TestSkip(ScopeId),
    /// The test body is about to run (after per-test setup).
    TestFnStart(ScopeId),
    TestFnSuccess(ScopeId),
    TestFnFailure(ScopeId),
}

impl LifecycleEvent {
    pub fn scope(&self) -> ScopeId {
        match *self {
            LifecycleEvent::SuiteStart(id)
            | LifecycleEvent::SuiteEnd(id)
            | LifecycleEvent::TestStart(id)
            | LifecycleEvent::TestDone(id)
            | LifecycleEvent::TestSkip(id)
            | LifecycleEvent::TestFnStart(id)
            | LifecycleEvent::TestFnSuccess(id)
            | LifecycleEvent::TestFnFailure(id) => id,
        }
    }

    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::SuiteStart(_) => "suite_start",
            LifecycleEvent::SuiteEnd(_) => "suite_end",
            LifecycleEvent::TestStart(_) => "test_start",
            LifecycleEvent::TestDone(_) => "test_done",
            LifecycleEvent::TestSkip(_) => "test_skip",
            LifecycleEvent::TestFnStart(_) => "test_fn_start",
            LifecycleEvent::TestFnSuccess(_) => "test_fn_success",
            LifecycleEvent::TestFnFailure(_) => "test_fn_failure",
        }
    }
}
