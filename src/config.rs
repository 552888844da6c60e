//! Client configuration.
//!
//! Defaults are overridden by environment variables, which the CLI in turn
//! overrides with flags:
//!
//! - `ANONIUM_API_URL` - backend base URL (default `http://127.0.0.1:8000`)
//! - `ANONIUM_STATE_DIR` - directory for persisted view state
//! - `ANONIUM_CHILDREN_LIMIT` - children fetched per "load more"
//! - `ANONIUM_SORT` - `popular`, `new` or `old`
//! - `ANONIUM_TIMEOUT_SECS` - HTTP request timeout

use crate::comments::types::SortOrder;
use crate::error::{AnoniumError, Result};
use crate::retry::ROOT_RETRY_DELAYS;
use crate::validation::{Validator, DEFAULT_CHILDREN_LIMIT};
use std::path::PathBuf;
use std::time::Duration;

/// Default backend URL
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Directory name for persisted view state
pub const DEFAULT_STATE_DIR: &str = "anonium_state";

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default chat poll interval in seconds
pub const DEFAULT_CHAT_POLL_SECS: u64 = 5;

/// Upper bound for the chat poll interval after repeated failures
pub const DEFAULT_CHAT_MAX_BACKOFF_SECS: u64 = 60;

/// Configuration for the Anonium client.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash.
    pub api_url: String,
    /// Directory for persisted view state.
    pub state_dir: PathBuf,
    /// Children fetched per page.
    pub children_limit: usize,
    /// Comment sort order.
    pub sort: SortOrder,
    /// Include soft-deleted comments.
    pub include_deleted: bool,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// Delays between deep-thread root fetch attempts.
    pub root_retry_delays: Vec<Duration>,
    /// Base chat poll interval.
    pub chat_poll_interval: Duration,
    /// Maximum chat poll interval after failures.
    pub chat_max_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            children_limit: DEFAULT_CHILDREN_LIMIT,
            sort: SortOrder::default(),
            include_deleted: true,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            root_retry_delays: ROOT_RETRY_DELAYS.to_vec(),
            chat_poll_interval: Duration::from_secs(DEFAULT_CHAT_POLL_SECS),
            chat_max_backoff: Duration::from_secs(DEFAULT_CHAT_MAX_BACKOFF_SECS),
        }
    }
}

impl ClientConfig {
    /// Creates a config from defaults and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a config from defaults and a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("ANONIUM_API_URL") {
            config.set_api_url(&url);
        }

        if let Some(dir) = lookup("ANONIUM_STATE_DIR").filter(|d| !d.trim().is_empty()) {
            config.state_dir = PathBuf::from(dir);
        }

        if let Some(limit) = lookup("ANONIUM_CHILDREN_LIMIT") {
            config.children_limit = limit.trim().parse().map_err(|e| {
                AnoniumError::config(format!("Invalid ANONIUM_CHILDREN_LIMIT '{}': {}", limit, e))
            })?;
        }

        if let Some(sort) = lookup("ANONIUM_SORT") {
            config.sort = sort
                .parse()
                .map_err(|e| AnoniumError::config(format!("Invalid ANONIUM_SORT: {}", e)))?;
        }

        if let Some(secs) = lookup("ANONIUM_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                AnoniumError::config(format!("Invalid ANONIUM_TIMEOUT_SECS '{}': {}", secs, e))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the API URL, trimming whitespace and trailing slashes.
    pub fn set_api_url(&mut self, url: &str) {
        self.api_url = url.trim().trim_end_matches('/').to_string();
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        Validator::validate_base_url(&self.api_url)?;
        Validator::validate_children_limit(self.children_limit)
            .map_err(|e| AnoniumError::config(e.to_string()))?;
        if self.request_timeout.is_zero() {
            return Err(AnoniumError::config("Request timeout must be positive"));
        }
        if self.chat_poll_interval.is_zero() {
            return Err(AnoniumError::config("Chat poll interval must be positive"));
        }
        Ok(())
    }
}
