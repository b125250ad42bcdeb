//! Domain models for genforge.
//!
//! - `ValidationResult` and its findings: pure data produced by the validator
//! - `PipelineContext`: per-run mutable state threaded through every stage
//! - `PipelineResult`: the output contract of one run

pub mod context;
pub mod error;
pub mod result;
pub mod validation;

pub use context::{
    ModelUsage, PipelineContext, PipelineRequest, RepairAttempt, RollbackPoint, Stage,
};
pub use error::{ConfigError, ForgeError, Result, RouterError, StageError, TransportError};
pub use result::PipelineResult;
pub use validation::{
    ErrorCategory, ScorePenalties, Severity, ValidationFinding, ValidationResult,
};
