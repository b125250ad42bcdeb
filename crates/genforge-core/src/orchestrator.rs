//! Pipeline orchestrator.
//!
//! Runs the stages of one request in a fixed order:
//!
//! ```text
//! Context -> Intent -> [question: Respond] -> Plan -> Generate -> Filter
//!         -> Validate -> [invalid: Repair] -> Respond
//! ```
//!
//! Stages degrade to deterministic defaults instead of failing. A run fails
//! outright only when no provider is configured, when generation fails for
//! an existing project, or when cancellation is requested. Cancellation is
//! checked before each stage; an in-flight provider call always finishes.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{warn, Instrument};

use genforge_state::{ProjectStore, SessionStatus};

use crate::config::{ForgeConfig, PipelineSettings};
use crate::domain::{
    ConfigError, ForgeError, PipelineContext, PipelineRequest, PipelineResult, Result, RouterError,
    Stage,
};
use crate::obs;
use crate::provider::ChatMessage;
use crate::repair::{RepairPolicy, Repairer};
use crate::router::{Router, TaskType};
use crate::stages::{extract_intent, generate_code, plan_architecture};
use crate::tracer::StageTimer;
use crate::validator::Validator;
use crate::workspace::{retain_writeable, RuleClassifier, WorkspaceClassifier};

const CONVERSATION_SYSTEM_PROMPT: &str = "You are the assistant of a React website builder. \
Answer the user's question clearly and briefly. Do not generate project files.";

const CANNED_ANSWER: &str = "I can help you build and change React websites. \
Describe what you would like to create or change, for example: \
\"Add a pricing section with three plans\".";

pub struct Orchestrator {
    router: Arc<Router>,
    classifier: Arc<dyn WorkspaceClassifier>,
    store: Option<Arc<dyn ProjectStore>>,
    validator: Validator,
    settings: PipelineSettings,
    persist: bool,
    cancel: Option<watch::Receiver<bool>>,
}

impl Orchestrator {
    pub fn new(router: Arc<Router>, classifier: Arc<dyn WorkspaceClassifier>) -> Self {
        Self {
            router,
            classifier,
            store: None,
            validator: Validator::default(),
            settings: PipelineSettings::default(),
            persist: true,
            cancel: None,
        }
    }

    /// Router, default classifier, validator penalties and settings from `config`.
    pub fn from_config(config: &ForgeConfig) -> std::result::Result<Self, ConfigError> {
        let router = Router::from_config(config)?;
        Ok(Self::new(Arc::new(router), Arc::new(RuleClassifier::default()))
            .with_settings(config.pipeline.clone())
            .with_validator(Validator::new(config.validator.clone())))
    }

    pub fn with_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// When false, generated files are returned but never written to the store.
    pub fn persist_files(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Stop at the next stage boundary once `cancel` reads `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Build the run context, loading existing files from the store if one is attached.
    pub async fn prepare_context(&self, request: PipelineRequest) -> Result<PipelineContext> {
        let mut ctx = PipelineContext::new(request, Vec::new());
        let timer = ctx.tracer.start_stage(&ctx.session_id, Stage::Context);
        let loaded = match &self.store {
            Some(store) => store.get_existing_files(&ctx.workspace_id).await,
            None => Ok(Vec::new()),
        };
        ctx.tracer.finish_stage(&ctx.session_id, timer, loaded.is_ok());
        ctx.existing_files = loaded?;
        Ok(ctx)
    }

    /// `prepare_context` then `run`; a context failure becomes a failed result.
    pub async fn execute(&self, request: PipelineRequest) -> PipelineResult {
        match self.prepare_context(request).await {
            Ok(mut ctx) => self.run(&mut ctx).await,
            Err(e) => PipelineResult::failure(
                "Could not load the workspace for this request.",
                vec![e.to_string()],
            ),
        }
    }

    /// Run every stage against `ctx` and assemble the result.
    pub async fn run(&self, ctx: &mut PipelineContext) -> PipelineResult {
        let span = obs::run_span(&ctx.session_id);
        async move {
            obs::emit_run_started(&ctx.session_id, &ctx.workspace_id, ctx.is_new_project());
            let result = match self.run_stages(ctx).await {
                Ok(result) => result,
                Err(e) => self.fail(ctx, e).await,
            };
            obs::emit_run_finished(
                &ctx.session_id,
                ctx.tracer.elapsed_ms(),
                result.file_count(),
                result.success,
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn fail(&self, ctx: &PipelineContext, error: ForgeError) -> PipelineResult {
        warn!(session_id = %ctx.session_id, error = %error, "pipeline run failed");
        self.publish(&ctx.session_id, SessionStatus::Failed, Some(json!({ "error": error.to_string() })))
            .await;
        let message = match &error {
            ForgeError::Router(RouterError::NoProviders) => {
                "No AI provider is configured, so nothing could be generated."
            }
            ForgeError::Cancelled(_) => "The run was cancelled.",
            _ => "Something went wrong while generating your project.",
        };
        let mut result = PipelineResult::failure(message, vec![error.to_string()]);
        result.models_used = ctx.models_used.iter().map(|m| m.label()).collect();
        result.telemetry = Some(ctx.tracer.report());
        result
    }

    async fn publish(&self, session_id: &str, status: SessionStatus, extra: Option<serde_json::Value>) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.update_session_status(session_id, status, extra).await {
            obs::emit_status_update_failed(session_id, &status.to_string(), &e);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn begin(&self, ctx: &PipelineContext, stage: Stage) -> Result<StageTimer> {
        if self.cancelled() {
            return Err(ForgeError::Cancelled(stage));
        }
        Ok(ctx.tracer.start_stage(&ctx.session_id, stage))
    }

    async fn run_stages(&self, ctx: &mut PipelineContext) -> Result<PipelineResult> {
        if !self.router.has_providers() {
            return Err(RouterError::NoProviders.into());
        }

        // Intent
        let timer = self.begin(ctx, Stage::Intent)?;
        self.publish(&ctx.session_id, SessionStatus::Analyzing, None).await;
        let outcome = extract_intent(&self.router, ctx).await;
        if let Some(response) = &outcome.response {
            ctx.record_model_call(Stage::Intent, TaskType::Intent, response);
        }
        let is_question = outcome.intent.is_question();
        ctx.intent = Some(outcome.intent);
        ctx.tracer.finish_stage(&ctx.session_id, timer, true);

        if is_question {
            return self.respond_conversation(ctx).await;
        }

        // Plan
        let timer = self.begin(ctx, Stage::Plan)?;
        self.publish(&ctx.session_id, SessionStatus::Planning, None).await;
        let outcome = plan_architecture(&self.router, ctx).await;
        if let Some(response) = &outcome.response {
            ctx.record_model_call(Stage::Plan, TaskType::Planning, response);
        }
        ctx.plan = Some(outcome.plan);
        ctx.tracer.finish_stage(&ctx.session_id, timer, !outcome.used_default);

        // Generate
        let timer = self.begin(ctx, Stage::Generate)?;
        self.publish(&ctx.session_id, SessionStatus::Generating, None).await;
        let generated =
            generate_code(&self.router, ctx, &self.settings, self.classifier.as_ref()).await;
        let outcome = match generated {
            Ok(outcome) => outcome,
            Err(e) => {
                ctx.tracer.finish_stage(&ctx.session_id, timer, false);
                return Err(e.into());
            }
        };
        if let Some(response) = &outcome.response {
            ctx.record_model_call(Stage::Generate, TaskType::Coding, response);
        }
        let used_default = outcome.used_default;
        let mut dropped = outcome.dropped;
        ctx.generated_files = outcome.files;
        ctx.tracer.finish_stage(&ctx.session_id, timer, !used_default);
        ctx.create_rollback_point(Stage::Generate);

        // Filter
        let timer = self.begin(ctx, Stage::Filter)?;
        // Generate already filtered its reply; this also covers the baseline.
        dropped.extend(retain_writeable(&mut ctx.generated_files, self.classifier.as_ref()));
        if !dropped.is_empty() {
            warn!(session_id = %ctx.session_id, ?dropped, "dropped files outside writeable paths");
        }
        ctx.tracer.finish_stage(&ctx.session_id, timer, true);

        // Validate
        let timer = self.begin(ctx, Stage::Validate)?;
        self.publish(&ctx.session_id, SessionStatus::Validating, None).await;
        let validation = self.validator.validate(&ctx.generated_files);
        ctx.tracer.record_validation(&ctx.session_id, &validation);
        ctx.validation_results.push(validation.clone());
        ctx.tracer.finish_stage(&ctx.session_id, timer, validation.valid);

        // Repair
        if !validation.valid {
            let timer = self.begin(ctx, Stage::Repair)?;
            self.publish(
                &ctx.session_id,
                SessionStatus::Repairing,
                Some(json!({ "critical_errors": validation.critical_errors.len() })),
            )
            .await;
            let policy = RepairPolicy {
                max_attempts: self.settings.max_repair_attempts,
                ..RepairPolicy::default()
            };
            let repairer = Repairer::new(&self.validator, self.classifier.as_ref(), policy)
                .with_router(&self.router);
            let files = std::mem::take(&mut ctx.generated_files);
            let outcome = repairer.run(files, validation).await;

            for response in &outcome.models_used {
                ctx.record_model_call(Stage::Repair, TaskType::Repair, response);
            }
            for attempt in &outcome.attempts {
                ctx.tracer.record_repair_attempt(&ctx.session_id, attempt);
            }
            ctx.repair_history.extend(outcome.attempts);
            ctx.tracer.record_validation(&ctx.session_id, &outcome.validation);
            ctx.validation_results.push(outcome.validation);
            ctx.generated_files = outcome.files;
            ctx.tracer.finish_stage(&ctx.session_id, timer, outcome.success);
            ctx.create_rollback_point(Stage::Repair);
        }

        self.respond(ctx, used_default).await
    }

    async fn respond_conversation(&self, ctx: &mut PipelineContext) -> Result<PipelineResult> {
        let timer = self.begin(ctx, Stage::Respond)?;
        let mut messages = vec![ChatMessage::system(CONVERSATION_SYSTEM_PROMPT)];
        messages.extend(ctx.history.iter().cloned());
        messages.push(ChatMessage::user(ctx.prompt.clone()));

        let answer = match self
            .router
            .call_with_fallback(TaskType::Conversation, messages)
            .await
        {
            Ok(response) => {
                ctx.record_model_call(Stage::Respond, TaskType::Conversation, &response);
                response.content
            }
            Err(e) => {
                obs::emit_stage_degraded(&ctx.session_id, "respond", &e);
                CANNED_ANSWER.to_string()
            }
        };
        ctx.tracer.finish_stage(&ctx.session_id, timer, true);
        self.publish(&ctx.session_id, SessionStatus::Completed, Some(json!({ "files": 0 })))
            .await;

        Ok(PipelineResult {
            success: true,
            files: Vec::new(),
            models_used: ctx.models_used.iter().map(|m| m.label()).collect(),
            validation_passed: true,
            validation_score: None,
            repair_attempts: 0,
            errors: None,
            ai_message: answer,
            routes: Vec::new(),
            suggestions: Vec::new(),
            telemetry: Some(ctx.tracer.report()),
        })
    }

    async fn respond(&self, ctx: &mut PipelineContext, used_default: bool) -> Result<PipelineResult> {
        let timer = self.begin(ctx, Stage::Respond)?;
        let validation = ctx.latest_validation().cloned();
        let (valid, score, mut errors, suggestions) = match &validation {
            Some(v) => (
                v.valid,
                Some(v.score),
                v.critical_errors
                    .iter()
                    .map(|e| format!("{}: {}", e.file, e.message))
                    .collect::<Vec<_>>(),
                v.suggestions.clone(),
            ),
            None => (true, None, Vec::new(), Vec::new()),
        };

        let mut saved = false;
        if let (Some(store), true) = (&self.store, self.persist) {
            match store.save_files(&ctx.workspace_id, &ctx.generated_files).await {
                Ok(()) => saved = true,
                Err(e) => {
                    obs::emit_stage_degraded(&ctx.session_id, "respond", &e);
                    errors.push(format!("could not save files: {e}"));
                }
            }
        }

        let repair_attempts = ctx.repair_history.len() as u32;
        let ai_message = summary_message(ctx, used_default, valid, score, repair_attempts);
        ctx.tracer.finish_stage(&ctx.session_id, timer, true);
        self.publish(
            &ctx.session_id,
            SessionStatus::Completed,
            Some(json!({
                "files": ctx.generated_files.len(),
                "valid": valid,
                "saved": saved,
            })),
        )
        .await;

        Ok(PipelineResult {
            success: true,
            files: ctx.generated_files.clone(),
            models_used: ctx.models_used.iter().map(|m| m.label()).collect(),
            validation_passed: valid,
            validation_score: score,
            repair_attempts,
            errors: (!errors.is_empty()).then_some(errors),
            ai_message,
            routes: ctx
                .plan
                .as_ref()
                .map(|p| p.routes.clone())
                .unwrap_or_default(),
            suggestions,
            telemetry: Some(ctx.tracer.report()),
        })
    }
}

fn summary_message(
    ctx: &PipelineContext,
    used_default: bool,
    valid: bool,
    score: Option<f32>,
    repair_attempts: u32,
) -> String {
    let count = ctx.generated_files.iter().filter(|f| !f.is_delete()).count();
    let mut message = if ctx.is_new_project() {
        let kind = ctx
            .plan
            .as_ref()
            .map(|p| p.project_type.replace('_', " "))
            .unwrap_or_else(|| "website".to_string());
        format!("Created {count} file(s) for your {kind} project.")
    } else {
        format!("Updated {count} file(s) in your project.")
    };
    if used_default {
        message.push_str(" The AI providers did not return usable code, so a starter layout was used.");
    }
    match (valid, score) {
        (true, Some(score)) => message.push_str(&format!(" All files passed validation (score {score:.0}).")),
        (true, None) => {}
        (false, _) => message.push_str(&format!(
            " Some issues remain after {repair_attempts} repair attempt(s); see errors for details."
        )),
    }
    message
}
