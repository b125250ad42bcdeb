//! Storage trait definitions for genforge
//!
//! `ProjectStore` is the persistence collaborator of the pipeline:
//! - load the files that already exist in a workspace
//! - save a generated file set back
//! - publish per-session pipeline status
//!
//! The trait is async and backend-agnostic. An in-memory fake lives in
//! `fakes`, a filesystem backend in `fs`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::file_op::FileOperation;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Pipeline status as seen by whoever polls a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Analyzing,
    Planning,
    Generating,
    Validating,
    Repairing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Planning => "planning",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Repairing => "repairing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Last status published for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub status: SessionStatus,
    /// Free-form details (stage name, file counts, error text).
    pub extra: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// Workspace file persistence plus session status publication.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Files currently in the workspace. An unknown workspace has no files.
    async fn get_existing_files(&self, workspace_id: &str) -> StoreResult<Vec<FileOperation>>;

    /// Apply a file set: create/update write content, delete removes.
    async fn save_files(&self, workspace_id: &str, files: &[FileOperation]) -> StoreResult<()>;

    /// Record the latest status for a session.
    async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        extra: Option<serde_json::Value>,
    ) -> StoreResult<()>;

    /// Read the latest status. Returns `StoreError::SessionNotFound` if never set.
    async fn session_status(&self, session_id: &str) -> StoreResult<SessionRecord>;
}
