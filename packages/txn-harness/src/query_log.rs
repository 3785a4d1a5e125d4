//! Per-test query log.
//!
//! The buffer only collects between a test function's start and end events.
//! At the end, the collected statements are written to a [`QueryLogSink`],
//! one line per statement, each tagged with the test's breadcrumb.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::info;

use crate::client::{QueryEvent, QueryListener};

/// Destination for per-test query lines.
pub trait QueryLogSink: Send + Sync {
    fn emit(&self, breadcrumb: &str, event: &QueryEvent);
}

/// Writes query lines through `tracing` under the `txn_harness::query` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingQueryLog;

impl QueryLogSink for TracingQueryLog {
    fn emit(&self, breadcrumb: &str, event: &QueryEvent) {
        info!(
            target: "txn_harness::query",
            breadcrumb = %breadcrumb,
            elapsed_ms = event.elapsed.as_millis() as u64,
            failed = event.failed,
            "query {}",
            event.query
        );
    }
}

/// Keeps emitted lines in memory.
#[derive(Debug, Default)]
pub struct MemoryQueryLog {
    lines: Mutex<Vec<(String, String)>>,
}

impl MemoryQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(breadcrumb, query)` pairs in emission order.
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl QueryLogSink for MemoryQueryLog {
    fn emit(&self, breadcrumb: &str, event: &QueryEvent) {
        self.lines
            .lock()
            .push((breadcrumb.to_string(), event.query.clone()));
    }
}

/// Query events collected for the running test function.
#[derive(Debug, Default, Clone)]
pub struct QueryLogBuffer {
    events: Arc<Mutex<Option<Vec<QueryEvent>>>>,
}

impl QueryLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting, discarding anything left from a previous test.
    pub fn start(&self) {
        *self.events.lock() = Some(Vec::new());
    }

    /// Record an event. Ignored while not collecting.
    pub fn push(&self, event: &QueryEvent) {
        if let Some(events) = self.events.lock().as_mut() {
            events.push(event.clone());
        }
    }

    /// Stop collecting and hand back what was collected.
    pub fn take(&self) -> Option<Vec<QueryEvent>> {
        self.events.lock().take()
    }

    pub fn is_collecting(&self) -> bool {
        self.events.lock().is_some()
    }

    /// Listener feeding this buffer. It holds the buffer weakly, so it goes
    /// quiet once every owner of the buffer is gone.
    pub fn listener(&self) -> QueryListener {
        let events: Weak<Mutex<Option<Vec<QueryEvent>>>> = Arc::downgrade(&self.events);
        Arc::new(move |event: &QueryEvent| {
            if let Some(events) = events.upgrade() {
                if let Some(buffer) = events.lock().as_mut() {
                    buffer.push(event.clone());
                }
            }
        })
    }
}
