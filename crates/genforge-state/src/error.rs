//! Error types for genforge-state

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Workspace has never been written
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// Session has no recorded status
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Path escapes the workspace root or is otherwise unusable
    #[error("Unsafe path rejected: {path}")]
    UnsafePath { path: String },

    /// Filesystem error
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
