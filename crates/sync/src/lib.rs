// Workflow State Synchronizer
//
// Keeps one consistent, continuously updated view of where the workflow
// stands, shared by every consumer in the process.
//
// Key design decisions:
// - A reducer task is the single writer of the StateMap (no locks, no torn keys)
// - Snapshot pulls are retried with a fixed delay and are folded before get_snapshot returns
// - The push connection is supervised: exponential backoff, snapshot resync on every connect
// - A failing push connection only ends that connection; the shared map keeps serving consumers
// - Per-key streams replay the latest state and only emit on status transitions

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod source;
pub mod synchronizer;

mod reducer;
mod supervisor;

// Re-exports for convenience
pub use client::WorkflowApiClient;
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use retry::RetryPolicy;
pub use source::{PushSource, PushStream, SnapshotSource};
pub use synchronizer::{StateStream, StateSynchronizer};
