//! Bounded self-repair.
//!
//! Each attempt walks the same states:
//!
//! ```text
//! Attempting -> AutoFixed -> AiRepairing -> Revalidating -> Resolved | Exhausted
//! ```
//!
//! `AutoFixed` and `AiRepairing` are skipped when there is nothing to do. An
//! AI rewrite that leaves more critical errors than it started with is
//! discarded. A failed AI call is logged and the loop moves on with the
//! auto-fixed files.

pub mod autofix;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use genforge_state::{merge_by_path, FileOperation};

use crate::domain::{RepairAttempt, RouterError, ValidationResult};
use crate::extract::extract_labeled_files;
use crate::provider::ChatMessage;
use crate::router::{RoutedResponse, Router, TaskType};
use crate::validator::Validator;
use crate::workspace::{retain_writeable, WorkspaceClassifier};

pub use autofix::{apply_auto_fixes, Patch, PatchKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairPolicy {
    pub max_attempts: u32,
    pub ai_repair: bool,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            ai_repair: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairState {
    Attempting,
    AutoFixed,
    AiRepairing,
    Revalidating,
    Resolved,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub files: Vec<FileOperation>,
    pub validation: ValidationResult,
    pub attempts: Vec<RepairAttempt>,
    pub success: bool,
    pub final_state: RepairState,
    pub models_used: Vec<RoutedResponse>,
}

const REPAIR_SYSTEM_PROMPT: &str = "You repair React + TypeScript source files. \
Return every file you change as the complete file in a fenced block whose header is \
`language:path`, for example ```tsx:src/components/Hero.tsx. \
Never elide code, never leave placeholder comments, and keep every import the file needs.";

pub struct Repairer<'a> {
    router: Option<&'a Router>,
    validator: &'a Validator,
    classifier: &'a dyn WorkspaceClassifier,
    policy: RepairPolicy,
}

impl<'a> Repairer<'a> {
    pub fn new(
        validator: &'a Validator,
        classifier: &'a dyn WorkspaceClassifier,
        policy: RepairPolicy,
    ) -> Self {
        Self {
            router: None,
            validator,
            classifier,
            policy,
        }
    }

    pub fn with_router(mut self, router: &'a Router) -> Self {
        self.router = Some(router);
        self
    }

    fn ai_available(&self) -> Option<&'a Router> {
        self.router
            .filter(|r| self.policy.ai_repair && r.has_providers())
    }

    /// Repair `files` until they validate or the attempt budget runs out.
    pub async fn run(&self, files: Vec<FileOperation>, validation: ValidationResult) -> RepairOutcome {
        let mut files = files;
        let mut current = validation;
        let mut attempts = Vec::new();
        let mut models_used = Vec::new();

        if current.valid {
            return RepairOutcome {
                files,
                validation: current,
                attempts,
                success: true,
                final_state: RepairState::Resolved,
                models_used,
            };
        }

        let mut final_state = RepairState::Exhausted;
        for attempt in 1..=self.policy.max_attempts {
            let mut transitions = vec![RepairState::Attempting];
            let errors_at_start: Vec<String> = current
                .critical_errors
                .iter()
                .map(|e| format!("{}: {}", e.file, e.message))
                .collect();

            let mut patches = apply_auto_fixes(&mut files, &current);
            if !patches.is_empty() {
                transitions.push(RepairState::AutoFixed);
                current = self.validator.validate(&files);
            }

            let router = self.ai_available();
            if let (false, Some(router)) = (current.valid, router) {
                transitions.push(RepairState::AiRepairing);
                match self.ai_repair(router, &files, &current).await {
                    Ok((response, repaired)) => {
                        models_used.push(response);
                        let snapshot = files.clone();
                        let changed: Vec<String> = repaired.iter().map(|f| f.path.clone()).collect();
                        merge_by_path(&mut files, repaired);
                        let revalidated = self.validator.validate(&files);
                        if revalidated.critical_errors.len() > current.critical_errors.len() {
                            warn!(
                                attempt,
                                before = current.critical_errors.len(),
                                after = revalidated.critical_errors.len(),
                                "discarding AI repair that added errors"
                            );
                            files = snapshot;
                        } else {
                            patches.extend(changed.into_iter().map(|file| Patch {
                                file,
                                kind: PatchKind::AiRewrite,
                                description: "rewritten by AI repair".to_string(),
                            }));
                        }
                    }
                    Err(err) => warn!(attempt, error = %err, "AI repair call failed"),
                }
            }

            transitions.push(RepairState::Revalidating);
            current = self.validator.validate(&files);
            let resolved = current.valid;
            let stuck = patches.is_empty() && router.is_none();
            let last = attempt == self.policy.max_attempts;
            if resolved {
                transitions.push(RepairState::Resolved);
                final_state = RepairState::Resolved;
            } else if stuck || last {
                transitions.push(RepairState::Exhausted);
            }

            debug!(attempt, patches = patches.len(), resolved, "repair attempt finished");
            attempts.push(RepairAttempt {
                attempt,
                errors_at_start,
                patches_applied: patches,
                resolved,
                transitions,
            });

            if resolved || stuck {
                break;
            }
        }

        RepairOutcome {
            success: current.valid,
            files,
            validation: current,
            attempts,
            final_state,
            models_used,
        }
    }

    async fn ai_repair(
        &self,
        router: &Router,
        files: &[FileOperation],
        validation: &ValidationResult,
    ) -> Result<(RoutedResponse, Vec<FileOperation>), RouterError> {
        let messages = repair_messages(files, validation);
        let response = router.call_with_fallback(TaskType::Repair, messages).await?;
        let mut repaired = extract_labeled_files(&response.content);
        let dropped = retain_writeable(&mut repaired, self.classifier);
        if !dropped.is_empty() {
            debug!(?dropped, "AI repair returned non-writeable paths");
        }
        for file in &mut repaired {
            if let Some(existing) = files.iter().find(|f| f.path == file.path) {
                file.operation = existing.operation;
            }
        }
        Ok((response, repaired))
    }
}

/// Broken files plus a consolidated error summary, in one request.
pub fn repair_messages(files: &[FileOperation], validation: &ValidationResult) -> Vec<ChatMessage> {
    let broken = validation.files_with_errors();
    let mut prompt = String::from("Fix these errors:\n");
    for error in &validation.critical_errors {
        prompt.push_str(&format!(
            "- [{}] {}: {} ({})\n",
            error.category, error.file, error.message, error.fix
        ));
    }
    prompt.push_str("\nFiles:\n");
    for file in files.iter().filter(|f| broken.contains(&f.path)) {
        let language = file.extension().unwrap_or_default();
        prompt.push_str(&format!("```{language}:{}\n{}", file.path, file.content));
        if !file.content.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str("```\n");
    }
    vec![ChatMessage::system(REPAIR_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}
