// CLI commands

pub mod check;
pub mod routes;
pub mod state;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use ballotflow_navigation::RouteTree;
use ballotflow_sync::SyncConfig;

/// Attempts a one-off command makes before giving up on an unreachable backend
const ONE_SHOT_ATTEMPTS: u32 = 3;

pub fn load_routes(path: &Path) -> Result<RouteTree> {
    RouteTree::load(path).with_context(|| format!("Failed to load route tree from {}", path.display()))
}

/// Configuration for commands that pull once and exit
///
/// The push connection is not opened and snapshot retries are bounded unless
/// the environment already bounds them.
pub fn one_shot(config: &SyncConfig) -> SyncConfig {
    bounded_snapshots(config).with_push_enabled(false)
}

/// Bound snapshot retries unless the environment already bounds them
pub fn bounded_snapshots(config: &SyncConfig) -> SyncConfig {
    let mut config = config.clone();
    if config.snapshot_retry.max_attempts.is_none() {
        config.snapshot_retry = config.snapshot_retry.with_max_attempts(ONE_SHOT_ATTEMPTS);
    }
    config
}
