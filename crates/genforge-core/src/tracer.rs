//! Per-run telemetry.
//!
//! The `Tracer` is owned by a `PipelineContext`. It keeps a typed event log
//! for the run and forwards every event to the `obs` emitters, so the same
//! facts reach both the returned `TelemetryReport` and the log stream.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ModelUsage, RepairAttempt, Stage, ValidationResult};
use crate::obs;
use crate::router::TaskType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    StageFinished {
        stage: Stage,
        duration_ms: u64,
        ok: bool,
    },
    ModelCall {
        stage: Stage,
        task: TaskType,
        provider: String,
        model: String,
        latency_ms: u64,
        used_fallback: bool,
        confidence: f32,
    },
    Validation {
        valid: bool,
        score: f32,
        critical: usize,
        warnings: usize,
    },
    RepairAttempt {
        attempt: u32,
        errors_at_start: usize,
        patches: usize,
        resolved: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub at: DateTime<Utc>,
    pub event: TelemetryEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
    pub ok: bool,
}

/// Summary attached to `PipelineResult::telemetry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub total_ms: u64,
    pub stage_timings: Vec<StageTiming>,
    pub model_calls: usize,
    pub fallbacks: usize,
    pub events: Vec<TelemetryRecord>,
}

/// Running stage; hand back to `Tracer::finish_stage`.
#[derive(Debug)]
pub struct StageTimer {
    stage: Stage,
    started: Instant,
}

impl StageTimer {
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

#[derive(Debug)]
pub struct Tracer {
    started: Instant,
    records: Vec<TelemetryRecord>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            records: Vec::new(),
        }
    }

    fn push(&mut self, event: TelemetryEvent) {
        self.records.push(TelemetryRecord {
            at: Utc::now(),
            event,
        });
    }

    pub fn start_stage(&self, session_id: &str, stage: Stage) -> StageTimer {
        obs::emit_stage_started(session_id, stage.as_str());
        StageTimer {
            stage,
            started: Instant::now(),
        }
    }

    pub fn finish_stage(&mut self, session_id: &str, timer: StageTimer, ok: bool) {
        let duration_ms = timer.started.elapsed().as_millis() as u64;
        obs::emit_stage_finished(session_id, timer.stage.as_str(), duration_ms, ok);
        self.push(TelemetryEvent::StageFinished {
            stage: timer.stage,
            duration_ms,
            ok,
        });
    }

    pub fn record_model_call(&mut self, session_id: &str, usage: &ModelUsage) {
        obs::emit_model_call(
            session_id,
            usage.stage.as_str(),
            &usage.provider,
            &usage.model,
            usage.latency_ms,
            usage.used_fallback,
        );
        self.push(TelemetryEvent::ModelCall {
            stage: usage.stage,
            task: usage.task,
            provider: usage.provider.clone(),
            model: usage.model.clone(),
            latency_ms: usage.latency_ms,
            used_fallback: usage.used_fallback,
            confidence: usage.confidence,
        });
    }

    pub fn record_validation(&mut self, session_id: &str, result: &ValidationResult) {
        obs::emit_validation(
            session_id,
            result.valid,
            result.score,
            result.critical_errors.len(),
            result.warnings.len(),
        );
        self.push(TelemetryEvent::Validation {
            valid: result.valid,
            score: result.score,
            critical: result.critical_errors.len(),
            warnings: result.warnings.len(),
        });
    }

    pub fn record_repair_attempt(&mut self, session_id: &str, attempt: &RepairAttempt) {
        obs::emit_repair_attempt(
            session_id,
            attempt.attempt,
            attempt.errors_at_start.len(),
            attempt.patches_applied.len(),
            attempt.resolved,
        );
        self.push(TelemetryEvent::RepairAttempt {
            attempt: attempt.attempt,
            errors_at_start: attempt.errors_at_start.len(),
            patches: attempt.patches_applied.len(),
            resolved: attempt.resolved,
        });
    }

    pub fn events(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Stages that finished, in order.
    pub fn stages_run(&self) -> Vec<Stage> {
        self.records
            .iter()
            .filter_map(|r| match r.event {
                TelemetryEvent::StageFinished { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn report(&self) -> TelemetryReport {
        let mut stage_timings = Vec::new();
        let mut model_calls = 0;
        let mut fallbacks = 0;
        for record in &self.records {
            match &record.event {
                TelemetryEvent::StageFinished {
                    stage,
                    duration_ms,
                    ok,
                } => stage_timings.push(StageTiming {
                    stage: *stage,
                    duration_ms: *duration_ms,
                    ok: *ok,
                }),
                TelemetryEvent::ModelCall { used_fallback, .. } => {
                    model_calls += 1;
                    if *used_fallback {
                        fallbacks += 1;
                    }
                }
                _ => {}
            }
        }
        TelemetryReport {
            total_ms: self.elapsed_ms(),
            stage_timings,
            model_calls,
            fallbacks,
            events: self.records.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_stage_timings_in_order() {
        let mut tracer = Tracer::new();
        let t = tracer.start_stage("s", Stage::Intent);
        tracer.finish_stage("s", t, true);
        let t = tracer.start_stage("s", Stage::Plan);
        tracer.finish_stage("s", t, false);

        let report = tracer.report();
        assert_eq!(report.stage_timings.len(), 2);
        assert_eq!(report.stage_timings[0].stage, Stage::Intent);
        assert!(!report.stage_timings[1].ok);
        assert_eq!(tracer.stages_run(), vec![Stage::Intent, Stage::Plan]);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = TelemetryEvent::Validation {
            valid: true,
            score: 100.0,
            critical: 0,
            warnings: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "validation");
    }
}
