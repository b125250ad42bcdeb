//! Workspace path classification.
//!
//! Decides which generated paths the pipeline may write. Internal, system
//! and runtime paths are never writeable; traversal and absolute paths are
//! rejected outright, whatever the rules say.

use serde::{Deserialize, Serialize};

use genforge_state::FileOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathClass {
    Internal,
    System,
    Generated,
    Runtime,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub trait WorkspaceClassifier: Send + Sync {
    fn classify(&self, path: &str) -> PathClass;

    fn validate_path(&self, path: &str) -> PathValidation {
        validate_path(path)
    }

    fn is_writeable(&self, path: &str) -> bool {
        self.validate_path(path).valid
            && matches!(self.classify(path), PathClass::Generated | PathClass::User)
    }
}

/// Structural path checks shared by every classifier.
pub fn validate_path(path: &str) -> PathValidation {
    let mut errors = Vec::new();
    if path.trim().is_empty() {
        errors.push("path is empty".to_string());
    }
    if path.contains('\0') {
        errors.push("path contains a NUL byte".to_string());
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        errors.push("path traversal (`..`) is not allowed".to_string());
    }
    let bytes = path.as_bytes();
    let drive_letter = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || path.starts_with('\\') || drive_letter {
        errors.push("absolute paths are not allowed".to_string());
    }
    PathValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Prefix and file-name lists per class. Checked in the order
/// internal, system, runtime, generated; anything else is user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
    pub internal: Vec<String>,
    pub system: Vec<String>,
    pub runtime: Vec<String>,
    pub generated: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            internal: strings(&[".genforge/", ".git/", ".env"]),
            system: strings(&[
                "package-lock.json",
                "pnpm-lock.yaml",
                "yarn.lock",
                "tsconfig.json",
                "tsconfig.node.json",
                "vite.config.ts",
            ]),
            runtime: strings(&["node_modules/", "dist/", "build/", ".cache/"]),
            generated: strings(&["src/", "public/"]),
        }
    }
}

/// A rule ending in `/` matches a directory prefix; anything else matches
/// the exact path or a file of that name anywhere (`.env` also matches `.env.local`).
fn rule_matches(rule: &str, path: &str) -> bool {
    if rule.ends_with('/') {
        return path.starts_with(rule) || path.contains(&format!("/{rule}"));
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    path == rule || name == rule || (rule.starts_with('.') && name.starts_with(&format!("{rule}.")))
}

#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: ClassificationRules,
}

impl RuleClassifier {
    pub fn new(rules: ClassificationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }
}

impl WorkspaceClassifier for RuleClassifier {
    fn classify(&self, path: &str) -> PathClass {
        let path = path.strip_prefix("./").unwrap_or(path);
        let any = |rules: &[String]| rules.iter().any(|r| rule_matches(r, path));
        if any(&self.rules.internal) {
            PathClass::Internal
        } else if any(&self.rules.system) {
            PathClass::System
        } else if any(&self.rules.runtime) {
            PathClass::Runtime
        } else if any(&self.rules.generated) {
            PathClass::Generated
        } else {
            PathClass::User
        }
    }
}

/// Keep only writeable files; returns the dropped paths.
pub fn retain_writeable(
    files: &mut Vec<FileOperation>,
    classifier: &dyn WorkspaceClassifier,
) -> Vec<String> {
    let mut dropped = Vec::new();
    files.retain(|f| {
        let keep = classifier.is_writeable(&f.path);
        if !keep {
            dropped.push(f.path.clone());
        }
        keep
    });
    dropped
}
