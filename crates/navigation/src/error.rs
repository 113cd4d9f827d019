// Error types for route tree loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for route tree operations
pub type Result<T> = std::result::Result<T, RouteTreeError>;

#[derive(Debug, Error)]
pub enum RouteTreeError {
    #[error("Failed to read route tree {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML route tree: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON route tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported route tree format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid route {path}: {reason}")]
    InvalidRoute { path: String, reason: String },
}
