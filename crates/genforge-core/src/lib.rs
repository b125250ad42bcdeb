//! Genforge Core Library
//!
//! Turns a natural-language prompt into a validated set of project files:
//! provider routing with confidence-based fallback, staged generation
//! (intent, plan, code), heuristic validation and bounded self-repair.
//!
//! The orchestrator is the entry point; every other module is usable on its
//! own (the validator, for instance, is a pure function over a file set).

pub mod artifact;
pub mod config;
pub mod domain;
pub mod extract;
pub mod obs;
pub mod orchestrator;
pub mod provider;
pub mod repair;
pub mod router;
pub mod stages;
pub mod telemetry;
pub mod tracer;
pub mod validator;
pub mod workspace;

pub use artifact::{read_run_artifact, result_digest, write_run_artifact, RunArtifact};
pub use config::{ForgeConfig, PipelineSettings, ProviderConfig};
pub use domain::{
    ConfigError, ErrorCategory, ForgeError, ModelUsage, PipelineContext, PipelineRequest,
    PipelineResult, RepairAttempt, Result, RollbackPoint, RouterError, ScorePenalties, Severity,
    Stage, StageError, TransportError, ValidationFinding, ValidationResult,
};
pub use orchestrator::Orchestrator;
pub use provider::{ChatMessage, ChatProvider, ChatRequest, ProviderRegistry, Role};
pub use repair::{RepairOutcome, RepairPolicy, RepairState, Repairer};
pub use router::{
    try_in_order, ConfidenceWeights, RoutedResponse, Router, RoutingEntry, RoutingTable, TaskType,
};
pub use stages::{ArchitecturePlan, Intent, IntentKind};
pub use tracer::{TelemetryEvent, TelemetryReport, Tracer};
pub use validator::Validator;
pub use workspace::{PathClass, RuleClassifier, WorkspaceClassifier};

pub use genforge_state::{FileOperation, OperationKind, ProjectStore, SessionStatus};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
