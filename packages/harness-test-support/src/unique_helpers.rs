//! Unique names for test data
//!
//! Tests that share one database file use these to keep their tables and
//! rows apart.

use ulid::Ulid;

/// Generate a unique string with the given prefix, formatted `{prefix}-{ulid}`.
///
/// # Examples
/// ```
/// use harness_test_support::unique_helpers::unique_str;
///
/// let a = unique_str("row");
/// let b = unique_str("row");
/// assert_ne!(a, b);
/// assert!(a.starts_with("row-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}

/// Generate a unique SQL identifier with the given prefix.
///
/// The ULID is lowercased and joined with `_` so the result can be used
/// unquoted as a table name in both SQLite and Postgres.
///
/// # Examples
/// ```
/// use harness_test_support::unique_helpers::unique_table;
///
/// let t = unique_table("widgets");
/// assert!(t.starts_with("widgets_"));
/// assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
/// ```
pub fn unique_table(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
}
