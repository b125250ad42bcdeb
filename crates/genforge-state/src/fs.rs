//! Filesystem-backed project store.
//!
//! Layout:
//! - `<root>/<workspace_id>/<relative path>` for workspace files
//! - `<root>/.genforge/sessions/<session_id>.json` for session status

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;
use crate::file_op::{FileOperation, OperationKind};
use crate::storage_traits::*;

/// Directories never read back as workspace files.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", ".genforge"];

/// Files above this size are not loaded as context.
const MAX_FILE_BYTES: u64 = 512 * 1024;

/// Project store rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    root: PathBuf,
}

impl FsProjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workspace_dir(&self, workspace_id: &str) -> StoreResult<PathBuf> {
        safe_join(&self.root, workspace_id)
    }

    fn session_path(&self, session_id: &str) -> StoreResult<PathBuf> {
        let dir = self.root.join(".genforge").join("sessions");
        safe_join(&dir, &format!("{session_id}.json"))
    }
}

/// Join `relative` onto `base`, refusing anything that could escape `base`.
pub fn safe_join(base: &Path, relative: &str) -> StoreResult<PathBuf> {
    let unsafe_path = || StoreError::UnsafePath {
        path: relative.to_string(),
    };
    if relative.is_empty() || relative.contains('\0') || relative.contains('\\') {
        return Err(unsafe_path());
    }
    let rel = Path::new(relative);
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(unsafe_path()),
        }
    }
    Ok(base.join(rel))
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    async fn get_existing_files(&self, workspace_id: &str) -> StoreResult<Vec<FileOperation>> {
        let base = self.workspace_dir(workspace_id)?;
        if !fs::try_exists(&base).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![base.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                let name = entry.file_name().to_string_lossy().to_string();

                if file_type.is_dir() {
                    if !SKIPPED_DIRS.contains(&name.as_str()) {
                        pending.push(path);
                    }
                    continue;
                }
                if !file_type.is_file() || entry.metadata().await?.len() > MAX_FILE_BYTES {
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&base) else {
                    continue;
                };
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                match fs::read_to_string(&path).await {
                    Ok(content) => files.push(FileOperation::update(relative, content)),
                    Err(e) => debug!(path = %relative, error = %e, "skipping unreadable file"),
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn save_files(&self, workspace_id: &str, files: &[FileOperation]) -> StoreResult<()> {
        let base = self.workspace_dir(workspace_id)?;
        for file in files {
            let target = safe_join(&base, &file.path)?;
            match file.operation {
                OperationKind::Delete => match fs::remove_file(&target).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                },
                OperationKind::Create | OperationKind::Update => {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent).await?;
                    }
                    fs::write(&target, file.content.as_bytes()).await?;
                }
            }
        }
        debug!(workspace_id, count = files.len(), "saved workspace files");
        Ok(())
    }

    async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        extra: Option<serde_json::Value>,
    ) -> StoreResult<()> {
        let path = self.session_path(session_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let record = SessionRecord {
            session_id: session_id.to_string(),
            status,
            extra,
            updated_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec_pretty(&record)?).await?;
        Ok(())
    }

    async fn session_status(&self, session_id: &str) -> StoreResult<SessionRecord> {
        let path = self.session_path(session_id)?;
        let bytes = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::SessionNotFound(session_id.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
