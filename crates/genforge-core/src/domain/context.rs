//! Per-run pipeline state.
//!
//! A `PipelineContext` is created once per request, mutated by each stage in
//! turn and dropped when the run ends. Nothing in it is shared across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use genforge_state::FileOperation;

use crate::domain::validation::ValidationResult;
use crate::provider::ChatMessage;
use crate::repair::{Patch, RepairState};
use crate::router::{RoutedResponse, TaskType};
use crate::stages::{ArchitecturePlan, Intent};
use crate::tracer::Tracer;

/// Named pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Context,
    Intent,
    Plan,
    Generate,
    Filter,
    Validate,
    Repair,
    Respond,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Intent => "intent",
            Self::Plan => "plan",
            Self::Generate => "generate",
            Self::Filter => "filter",
            Self::Validate => "validate",
            Self::Repair => "repair",
            Self::Respond => "respond",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound request for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub session_id: String,
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl PipelineRequest {
    /// Request with a fresh session id.
    pub fn new(workspace_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            workspace_id: workspace_id.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// One routed model call, as recorded on the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub stage: Stage,
    pub task: TaskType,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    pub used_fallback: bool,
    pub confidence: f32,
}

impl ModelUsage {
    /// `provider/model`, the form reported in `PipelineResult::models_used`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

/// Bookkeeping for one repair iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairAttempt {
    /// 1-based.
    pub attempt: u32,
    pub errors_at_start: Vec<String>,
    pub patches_applied: Vec<Patch>,
    pub resolved: bool,
    pub transitions: Vec<RepairState>,
}

/// Snapshot of the generated files at a stage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPoint {
    pub stage: Stage,
    pub file_snapshot: Vec<FileOperation>,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state for a single pipeline run.
#[derive(Debug)]
pub struct PipelineContext {
    pub session_id: String,
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub project_id: Option<String>,

    pub prompt: String,
    pub history: Vec<ChatMessage>,
    pub existing_files: Vec<FileOperation>,

    pub intent: Option<Intent>,
    pub plan: Option<ArchitecturePlan>,
    pub generated_files: Vec<FileOperation>,

    pub validation_results: Vec<ValidationResult>,
    pub repair_history: Vec<RepairAttempt>,
    pub rollback_points: Vec<RollbackPoint>,
    pub tracer: Tracer,
    pub models_used: Vec<ModelUsage>,
    pub started_at: DateTime<Utc>,
}

impl PipelineContext {
    pub fn new(request: PipelineRequest, existing_files: Vec<FileOperation>) -> Self {
        Self {
            session_id: request.session_id,
            workspace_id: request.workspace_id,
            user_id: request.user_id,
            project_id: request.project_id,
            prompt: request.prompt,
            history: request.history,
            existing_files,
            intent: None,
            plan: None,
            generated_files: Vec::new(),
            validation_results: Vec::new(),
            repair_history: Vec::new(),
            rollback_points: Vec::new(),
            tracer: Tracer::new(),
            models_used: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// A workspace with no existing files is a brand-new project.
    pub fn is_new_project(&self) -> bool {
        self.existing_files.is_empty()
    }

    /// Snapshot the current generated files under `stage`.
    pub fn create_rollback_point(&mut self, stage: Stage) {
        self.rollback_points.push(RollbackPoint {
            stage,
            file_snapshot: self.generated_files.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Most recent snapshot recorded for `stage`.
    pub fn latest_rollback(&self, stage: Stage) -> Option<&RollbackPoint> {
        self.rollback_points.iter().rev().find(|p| p.stage == stage)
    }

    /// Record a routed call on the context and in the run telemetry.
    pub fn record_model_call(&mut self, stage: Stage, task: TaskType, response: &RoutedResponse) {
        let usage = ModelUsage {
            stage,
            task,
            provider: response.provider.clone(),
            model: response.model.clone(),
            latency_ms: response.latency_ms,
            used_fallback: response.used_fallback,
            confidence: response.confidence,
        };
        self.tracer.record_model_call(&self.session_id, &usage);
        self.models_used.push(usage);
    }

    pub fn latest_validation(&self) -> Option<&ValidationResult> {
        self.validation_results.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PipelineContext {
        PipelineContext::new(PipelineRequest::new("ws", "build a landing page"), Vec::new())
    }

    #[test]
    fn new_context_is_new_project() {
        let ctx = ctx();
        assert!(ctx.is_new_project());
        assert!(!ctx.session_id.is_empty());
    }

    #[test]
    fn latest_rollback_returns_most_recent_for_stage() {
        let mut ctx = ctx();
        ctx.generated_files = vec![FileOperation::create("src/a.ts", "1")];
        ctx.create_rollback_point(Stage::Generate);
        ctx.generated_files = vec![FileOperation::create("src/a.ts", "2")];
        ctx.create_rollback_point(Stage::Repair);
        ctx.generated_files = vec![FileOperation::create("src/a.ts", "3")];
        ctx.create_rollback_point(Stage::Generate);

        let point = ctx.latest_rollback(Stage::Generate).unwrap();
        assert_eq!(point.file_snapshot[0].content, "3");
        assert_eq!(
            ctx.latest_rollback(Stage::Repair).unwrap().file_snapshot[0].content,
            "2"
        );
        assert!(ctx.latest_rollback(Stage::Plan).is_none());
    }

    #[test]
    fn record_model_call_appends_usage() {
        let mut ctx = ctx();
        let response = RoutedResponse {
            content: "ok".into(),
            provider: "groq".into(),
            model: "llama".into(),
            latency_ms: 12,
            used_fallback: true,
            confidence: 0.8,
            attempts: 2,
        };
        ctx.record_model_call(Stage::Intent, TaskType::Intent, &response);
        assert_eq!(ctx.models_used.len(), 1);
        assert_eq!(ctx.models_used[0].label(), "groq/llama");
        assert_eq!(ctx.tracer.report().fallbacks, 1);
    }
}
