use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::client::TransactionOptions;
use crate::error::HarnessError;

/// Default time allowed to acquire a transaction.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(5_000);
/// Default time a transaction body may stay open.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

pub const ENV_CLIENT: &str = "TXN_HARNESS_CLIENT";
pub const ENV_DATABASE_URL: &str = "TXN_HARNESS_DATABASE_URL";
pub const ENV_MAX_WAIT_MS: &str = "TXN_HARNESS_MAX_WAIT_MS";
pub const ENV_TIMEOUT_MS: &str = "TXN_HARNESS_TIMEOUT_MS";
pub const ENV_DISABLE_ROLLBACK: &str = "TXN_HARNESS_DISABLE_ROLLBACK";
pub const ENV_VERBOSE_QUERY: &str = "TXN_HARNESS_VERBOSE_QUERY";

/// Options recognized by the transaction delegate.
///
/// Deserializes from the runner's option object using camelCase keys, with
/// durations given in milliseconds:
///
/// ```
/// use std::time::Duration;
/// use txn_harness::config::HarnessOptions;
///
/// let options = HarnessOptions::from_json(r#"{"maxWait": 250, "verboseQuery": true}"#).unwrap();
/// assert_eq!(options.max_wait, Duration::from_millis(250));
/// assert_eq!(options.timeout, Duration::from_millis(5_000));
/// assert!(options.verbose_query);
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessOptions {
    /// Name of the client implementation to use. Must match the factory
    /// handed to the delegate; also keys the shared client handle.
    pub client_module_path: Option<String>,
    /// Overrides the connection target the client would otherwise use.
    pub connection_url: Option<String>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
    /// Commit at the end of each session instead of rolling back.
    pub disable_rollback: bool,
    /// Emit every query issued during a test, tagged with the test's breadcrumb.
    pub verbose_query: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            client_module_path: None,
            connection_url: None,
            max_wait: DEFAULT_MAX_WAIT,
            timeout: DEFAULT_TIMEOUT,
            disable_rollback: false,
            verbose_query: false,
        }
    }
}

impl HarnessOptions {
    /// Parse options from the runner's JSON option object.
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        serde_json::from_str(json)
            .map_err(|e| HarnessError::config(format!("invalid harness options: {e}")))
    }

    /// Build options from `TXN_HARNESS_*` environment variables.
    ///
    /// Unset variables keep their defaults; set-but-invalid values are errors.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut options = Self {
            client_module_path: optional_var(ENV_CLIENT),
            connection_url: optional_var(ENV_DATABASE_URL),
            ..Self::default()
        };

        if let Some(raw) = optional_var(ENV_MAX_WAIT_MS) {
            options.max_wait = parse_millis(ENV_MAX_WAIT_MS, &raw)?;
        }
        if let Some(raw) = optional_var(ENV_TIMEOUT_MS) {
            options.timeout = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = optional_var(ENV_DISABLE_ROLLBACK) {
            options.disable_rollback = parse_flag(ENV_DISABLE_ROLLBACK, &raw)?;
        }
        if let Some(raw) = optional_var(ENV_VERBOSE_QUERY) {
            options.verbose_query = parse_flag(ENV_VERBOSE_QUERY, &raw)?;
        }

        Ok(options)
    }

    pub fn transaction_options(&self) -> TransactionOptions {
        TransactionOptions {
            max_wait: self.max_wait,
            timeout: self.timeout,
            on_query: None,
        }
    }
}

/// Get an environment variable, treating empty values as unset
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration, HarnessError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| {
            HarnessError::config(format!(
                "Environment variable '{name}' must be a whole number of milliseconds, got '{raw}'"
            ))
        })
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, HarnessError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HarnessError::config(format!(
            "Environment variable '{name}' must be a boolean flag, got '{raw}'"
        ))),
    }
}
