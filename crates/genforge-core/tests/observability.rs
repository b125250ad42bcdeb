//! Structured tracing events for pipeline runs.

use std::sync::Arc;

use genforge_core::obs::{emit_fallback, emit_run_finished, emit_run_started, RunSpan};
use genforge_core::provider::fakes::ScriptedProvider;
use genforge_core::{
    ChatMessage, ChatProvider, ConfidenceWeights, Orchestrator, PipelineRequest, ProviderRegistry,
    Router, RoutingTable, RuleClassifier, TaskType,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn run_lifecycle_events_carry_their_fields() {
    let _span = RunSpan::enter("sess-obs-1");
    emit_run_started("sess-obs-1", "ws-obs", true);
    emit_run_finished("sess-obs-1", 1200, 6, true);

    assert!(logs_contain("run.started"));
    assert!(logs_contain("workspace_id=ws-obs"));
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("files=6"));
    assert!(logs_contain("genforge.run"));
}

#[traced_test]
#[test]
fn fallback_is_a_warning() {
    emit_fallback("coding", "deepseek", "deepseek-chat", "low confidence");
    assert!(logs_contain("WARN"));
    assert!(logs_contain("router.fallback"));
    assert!(logs_contain("provider=deepseek"));
}

#[traced_test]
#[tokio::test]
async fn router_logs_skipped_candidates() {
    let groq = ScriptedProvider::new("groq").failing();
    let openai = ScriptedProvider::new("openai")
        .always(r#"{"type": "general", "confidence": 0.8, "entities": []}"#);
    let router = Router::new(
        ProviderRegistry::new(vec![
            Arc::new(groq) as Arc<dyn ChatProvider>,
            Arc::new(openai) as Arc<dyn ChatProvider>,
        ]),
        RoutingTable::default(),
        ConfidenceWeights::default(),
    );

    let response = router
        .call_with_fallback(TaskType::Intent, vec![ChatMessage::user("make it blue")])
        .await
        .unwrap();

    assert_eq!(response.provider, "openai");
    assert!(logs_contain("router.fallback"));
    assert!(logs_contain("provider=groq"));
    assert!(logs_contain("connection refused"));
}

#[traced_test]
#[tokio::test]
async fn pipeline_run_emits_stage_and_validation_events() {
    let router = Router::new(
        ProviderRegistry::new(vec![
            Arc::new(ScriptedProvider::new("openai").failing()) as Arc<dyn ChatProvider>
        ]),
        RoutingTable::default(),
        ConfidenceWeights::default(),
    );
    let orch = Orchestrator::new(Arc::new(router), Arc::new(RuleClassifier::default()));
    let request = PipelineRequest::new("ws", "Build a portfolio site");
    let session = request.session_id.clone();

    let result = orch.execute(request).await;
    assert!(result.success);

    assert!(logs_contain("run.started"));
    assert!(logs_contain(&format!("session_id={session}")));
    assert!(logs_contain("stage.finished"));
    assert!(logs_contain("stage.degraded"));
    assert!(logs_contain("validation.finished"));
    assert!(logs_contain("run.finished"));
}
