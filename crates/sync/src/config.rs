// Synchronizer Configuration
//
// Configuration for the workflow backend connection, loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

const DEFAULT_API_URL: &str = "http://localhost:8090";

/// Configuration for the state synchronizer
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the workflow backend (without trailing slash)
    pub api_url: String,

    /// Whether the server push connection is opened at all
    pub push_enabled: bool,

    /// Retry schedule for failed snapshot pulls
    pub snapshot_retry: RetryPolicy,

    /// Reconnect schedule for the push connection
    pub push_retry: RetryPolicy,

    /// Capacity of the reducer's input queue
    pub input_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            push_enabled: true,
            snapshot_retry: RetryPolicy::fixed(Duration::from_secs(1)),
            push_retry: RetryPolicy::exponential(),
            input_buffer: 256,
        }
    }
}

impl SyncConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `BALLOTFLOW_API_URL`: backend base URL (default: http://localhost:8090)
    /// - `BALLOTFLOW_PUSH_ENABLED`: open the push connection (default: true)
    /// - `BALLOTFLOW_SNAPSHOT_RETRY_MS`: fixed delay between snapshot retries (default: 1000)
    /// - `BALLOTFLOW_SNAPSHOT_MAX_ATTEMPTS`: give up after this many pulls (default: unbounded)
    /// - `BALLOTFLOW_PUSH_MAX_BACKOFF_MS`: cap for push reconnect backoff (default: 30000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("BALLOTFLOW_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url;
            }
        }

        config.push_enabled = env::var("BALLOTFLOW_PUSH_ENABLED")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        if let Some(delay) = env_millis("BALLOTFLOW_SNAPSHOT_RETRY_MS") {
            config.snapshot_retry = RetryPolicy::fixed(delay);
        }

        if let Some(attempts) = env::var("BALLOTFLOW_SNAPSHOT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.snapshot_retry = config.snapshot_retry.with_max_attempts(attempts);
        }

        if let Some(cap) = env_millis("BALLOTFLOW_PUSH_MAX_BACKOFF_MS") {
            config.push_retry = config.push_retry.with_max_interval(cap);
        }

        config
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_push_enabled(mut self, enabled: bool) -> Self {
        self.push_enabled = enabled;
        self
    }

    pub fn with_snapshot_retry(mut self, policy: RetryPolicy) -> Self {
        self.snapshot_retry = policy;
        self
    }

    pub fn with_push_retry(mut self, policy: RetryPolicy) -> Self {
        self.push_retry = policy;
        self
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
