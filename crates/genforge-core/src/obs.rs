//! Structured observability hooks for genforge run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via `RunSpan` RAII guard
//! - Emission functions for stage transitions, model calls, fallbacks,
//!   validation and repair outcomes
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`); degraded
//! paths use `warn!`.

use tracing::{debug, info, warn};

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// For synchronous code only, such as `genforge replay`: an entered span must
/// not be held across `.await`. The orchestrator uses [`run_span`] with
/// `tracing::Instrument` instead.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("session-12345");
/// // every tracing call below is tagged with session_id = "session-12345"
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the session id.
    pub fn enter(session_id: &str) -> Self {
        Self {
            _span: run_span(session_id).entered(),
        }
    }
}

/// The `genforge.run` span, unentered. Async callers attach it with
/// `tracing::Instrument` so the future stays `Send`.
pub fn run_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("genforge.run", session_id = %session_id)
}

/// Emit event: run started.
pub fn emit_run_started(session_id: &str, workspace_id: &str, new_project: bool) {
    info!(
        event = "run.started",
        session_id = %session_id,
        workspace_id = %workspace_id,
        new_project = new_project,
    );
}

/// Emit event: run finished with duration, file count and success status.
pub fn emit_run_finished(session_id: &str, duration_ms: u64, files: usize, success: bool) {
    info!(
        event = "run.finished",
        session_id = %session_id,
        duration_ms = duration_ms,
        files = files,
        success = success,
    );
}

pub fn emit_stage_started(session_id: &str, stage: &str) {
    info!(event = "stage.started", session_id = %session_id, stage = %stage);
}

pub fn emit_stage_finished(session_id: &str, stage: &str, duration_ms: u64, ok: bool) {
    info!(
        event = "stage.finished",
        session_id = %session_id,
        stage = %stage,
        duration_ms = duration_ms,
        ok = ok,
    );
}

/// Emit event: a stage absorbed a failure and substituted its default.
pub fn emit_stage_degraded(session_id: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "stage.degraded", session_id = %session_id, stage = %stage, error = %error);
}

/// Emit event: a routed model call was accepted.
pub fn emit_model_call(
    session_id: &str,
    stage: &str,
    provider: &str,
    model: &str,
    latency_ms: u64,
    used_fallback: bool,
) {
    info!(
        event = "model.call",
        session_id = %session_id,
        stage = %stage,
        provider = %provider,
        model = %model,
        latency_ms = latency_ms,
        used_fallback = used_fallback,
    );
}

/// Emit event: the router moved past a candidate.
pub fn emit_fallback(task: &str, provider: &str, model: &str, reason: &str) {
    warn!(
        event = "router.fallback",
        task = %task,
        provider = %provider,
        model = %model,
        reason = %reason,
    );
}

/// Emit event: a response scored under the task threshold.
pub fn emit_low_confidence(task: &str, provider: &str, confidence: f32, threshold: f32) {
    debug!(
        event = "router.low_confidence",
        task = %task,
        provider = %provider,
        confidence = confidence,
        threshold = threshold,
    );
}

pub fn emit_validation(session_id: &str, valid: bool, score: f32, critical: usize, warnings: usize) {
    info!(
        event = "validation.finished",
        session_id = %session_id,
        valid = valid,
        score = score,
        critical = critical,
        warnings = warnings,
    );
}

pub fn emit_repair_attempt(
    session_id: &str,
    attempt: u32,
    errors_at_start: usize,
    patches: usize,
    resolved: bool,
) {
    info!(
        event = "repair.attempt",
        session_id = %session_id,
        attempt = attempt,
        errors_at_start = errors_at_start,
        patches = patches,
        resolved = resolved,
    );
}

/// Emit event: a session status update could not be stored (warning level).
pub fn emit_status_update_failed(session_id: &str, status: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "session.status_failed",
        session_id = %session_id,
        status = %status,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _span = RunSpan::enter("test-session-id");
    }
}
