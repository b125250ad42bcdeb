//! Output contract of a pipeline run.

use serde::{Deserialize, Serialize};

use genforge_state::FileOperation;

use crate::tracer::TelemetryReport;

/// Final, serializable result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub files: Vec<FileOperation>,
    /// `provider/model` per routed call, in call order.
    pub models_used: Vec<String>,
    pub validation_passed: bool,
    pub validation_score: Option<f32>,
    pub repair_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub ai_message: String,
    pub routes: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryReport>,
}

impl PipelineResult {
    /// Failed run with a friendly message and generic remediation.
    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            files: Vec::new(),
            models_used: Vec::new(),
            validation_passed: false,
            validation_score: None,
            repair_attempts: 0,
            errors: Some(errors),
            ai_message: message.into(),
            routes: Vec::new(),
            suggestions: vec![
                "Check that at least one AI provider API key is configured.".to_string(),
                "Try rephrasing the request or making it more specific.".to_string(),
                "Retry in a moment if a provider was temporarily unavailable.".to_string(),
            ],
            telemetry: None,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.iter().filter(|f| !f.is_delete()).count()
    }
}
