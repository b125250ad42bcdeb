//! File operation records.
//!
//! A `FileOperation` is the atomic unit of generated output. Within one run
//! paths are unique: a later write for the same path replaces the earlier one.

use serde::{Deserialize, Serialize};

/// What the pipeline intends to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A `(path, content, operation)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    /// Workspace-relative path, `/`-separated.
    pub path: String,
    pub content: String,
    pub operation: OperationKind,
}

impl FileOperation {
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            operation: OperationKind::Create,
        }
    }

    pub fn update(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            operation: OperationKind::Update,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: String::new(),
            operation: OperationKind::Delete,
        }
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn is_delete(&self) -> bool {
        self.operation == OperationKind::Delete
    }
}

/// Merge `incoming` into `files` by path.
///
/// Existing entries are replaced in place so the first-appearance order is
/// kept; unseen paths are appended.
pub fn merge_by_path(files: &mut Vec<FileOperation>, incoming: Vec<FileOperation>) {
    for op in incoming {
        match files.iter_mut().find(|f| f.path == op.path) {
            Some(slot) => *slot = op,
            None => files.push(op),
        }
    }
}

/// Collapse duplicate paths, keeping the last write for each.
pub fn dedupe_by_path(files: Vec<FileOperation>) -> Vec<FileOperation> {
    let mut out = Vec::with_capacity(files.len());
    merge_by_path(&mut out, files);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            FileOperation::create("src/App.TSX", "").extension().as_deref(),
            Some("tsx")
        );
        assert_eq!(FileOperation::create("Makefile", "").extension(), None);
        assert_eq!(FileOperation::create("src/.env", "").extension(), None);
    }

    #[test]
    fn later_write_wins_and_keeps_position() {
        let mut files = vec![
            FileOperation::create("a.ts", "1"),
            FileOperation::create("b.ts", "2"),
        ];
        merge_by_path(
            &mut files,
            vec![
                FileOperation::update("a.ts", "3"),
                FileOperation::create("c.ts", "4"),
            ],
        );

        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["a.ts", "b.ts", "c.ts"]);
        assert_eq!(files[0].content, "3");
        assert_eq!(files[0].operation, OperationKind::Update);
    }

    #[test]
    fn dedupe_keeps_last() {
        let files = dedupe_by_path(vec![
            FileOperation::create("x.ts", "old"),
            FileOperation::create("x.ts", "new"),
        ]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "new");
    }

    #[test]
    fn operation_serializes_lowercase() {
        let json = serde_json::to_string(&FileOperation::delete("gone.ts")).unwrap();
        assert!(json.contains("\"operation\":\"delete\""));
    }
}
