//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryProjectStore`, which satisfies the `ProjectStore` contract
//! without touching the filesystem.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::file_op::{merge_by_path, FileOperation, OperationKind};
use crate::storage_traits::*;

/// In-memory project store backed by `HashMap<workspace_id, files>`.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    workspaces: Mutex<HashMap<String, Vec<FileOperation>>>,
    sessions: Mutex<HashMap<String, Vec<SessionRecord>>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a workspace with existing files.
    pub fn with_files(workspace_id: &str, files: Vec<FileOperation>) -> Self {
        let store = Self::new();
        store
            .workspaces
            .lock()
            .unwrap()
            .insert(workspace_id.to_string(), files);
        store
    }

    /// Every status published for a session, oldest first.
    pub fn status_history(&self, session_id: &str) -> Vec<SessionStatus> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(session_id)
            .map(|records| records.iter().map(|r| r.status).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get_existing_files(&self, workspace_id: &str) -> StoreResult<Vec<FileOperation>> {
        let workspaces = self.workspaces.lock().unwrap();
        Ok(workspaces.get(workspace_id).cloned().unwrap_or_default())
    }

    async fn save_files(&self, workspace_id: &str, files: &[FileOperation]) -> StoreResult<()> {
        let mut workspaces = self.workspaces.lock().unwrap();
        let current = workspaces.entry(workspace_id.to_string()).or_default();

        let (deletes, writes): (Vec<_>, Vec<_>) = files
            .iter()
            .cloned()
            .partition(|f| f.operation == OperationKind::Delete);
        current.retain(|f| !deletes.iter().any(|d| d.path == f.path));
        merge_by_path(current, writes);
        Ok(())
    }

    async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        extra: Option<serde_json::Value>,
    ) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .push(SessionRecord {
                session_id: session_id.to_string(),
                status,
                extra,
                updated_at: Utc::now(),
            });
        Ok(())
    }

    async fn session_status(&self, session_id: &str) -> StoreResult<SessionRecord> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(session_id)
            .and_then(|records| records.last().cloned())
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }
}
