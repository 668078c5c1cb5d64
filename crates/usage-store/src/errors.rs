//! Error types for the usage-store crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to create the data directory
    #[error("Failed to create data directory: {path:?}")]
    DataDirectoryCreationFailed { path: PathBuf },

    /// Failed to determine the system data directory
    #[error("Failed to determine system data directory")]
    SystemDataDirectoryNotFound,
}
