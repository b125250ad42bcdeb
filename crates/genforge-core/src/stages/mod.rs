//! Pipeline stages: intent, plan and generate.
//!
//! Each stage reads the `PipelineContext` and returns an outcome the
//! orchestrator applies. Intent and plan never fail; generation fails only
//! for existing projects.

pub mod assets;
pub mod defaults;
pub mod generate;
pub mod intent;
pub mod plan;

pub use assets::{detect_niche, Niche};
pub use defaults::{default_files, Branding, DEFAULT_PATHS};
pub use generate::{build_generation_messages, generate_code, GenerationOutcome};
pub use intent::{detect_question, extract_intent, heuristic_intent, Intent, IntentKind, IntentOutcome, IntentSource};
pub use plan::{
    default_plan, plan_architecture, ArchitecturePlan, ComponentPlan, ImageAsset, PagePlan, PlanOutcome, Theme,
};
