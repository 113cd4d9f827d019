// Error types for the state synchronizer

use thiserror::Error;

/// Result type alias for synchronizer operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while pulling or streaming workflow state
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A record could not be decoded as a WorkflowState
    #[error("Failed to decode workflow state: {0}")]
    Decode(#[from] serde_json::Error),

    /// The push stream failed
    #[error("Push stream error: {0}")]
    Stream(String),

    /// Snapshot pull kept failing until the retry policy gave up
    #[error("Snapshot failed after {attempts} attempts: {source}")]
    SnapshotExhausted {
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// The synchronizer was shut down
    #[error("State synchronizer is shut down")]
    Closed,
}

impl SyncError {
    /// Create a push stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        SyncError::Stream(msg.into())
    }

    /// Malformed individual records are skipped by the push supervisor
    /// instead of dropping the connection.
    pub fn is_decode(&self) -> bool {
        matches!(self, SyncError::Decode(_))
    }
}
