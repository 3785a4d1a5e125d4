//! Test support utilities for txn-harness
//!
//! Shared helpers for the harness integration tests: one-time tracing setup
//! and unique identifiers for tables and rows.

pub mod test_logging;
pub mod unique_helpers;
