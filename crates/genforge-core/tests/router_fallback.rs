//! Router fallback across several providers.

use std::sync::Arc;

use genforge_core::provider::fakes::ScriptedProvider;
use genforge_core::{
    ChatMessage, ChatProvider, ConfidenceWeights, ProviderRegistry, Router, RouterError,
    RoutingTable, TaskType,
};

const GOOD_PLAN: &str = r#"{"projectType": "saas", "pages": [], "components": []}"#;

fn router(providers: Vec<Arc<ScriptedProvider>>) -> Router {
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn ChatProvider>)
        .collect();
    Router::new(
        ProviderRegistry::new(providers),
        RoutingTable::default(),
        ConfidenceWeights::default(),
    )
}

fn messages() -> Vec<ChatMessage> {
    vec![ChatMessage::user("plan a saas landing page")]
}

#[tokio::test]
async fn failing_and_low_confidence_candidates_are_skipped() {
    // planning: openai (primary) -> deepseek (fallback) -> remaining providers
    let openai = Arc::new(ScriptedProvider::new("openai").failing());
    let deepseek = Arc::new(ScriptedProvider::new("deepseek").always("not json at all, sorry"));
    let groq = Arc::new(ScriptedProvider::new("groq").always(GOOD_PLAN));
    let router = router(vec![groq.clone(), deepseek.clone(), openai.clone()]);

    let response = router
        .call_with_fallback(TaskType::Planning, messages())
        .await
        .unwrap();

    assert_eq!(response.provider, "groq");
    assert!(response.used_fallback);
    assert_eq!(response.attempts, 3);
    assert_eq!(openai.call_count(), 1);
    assert_eq!(deepseek.call_count(), 1);
    assert_eq!(groq.call_count(), 1);
}

#[tokio::test]
async fn each_provider_is_tried_at_most_once() {
    let providers: Vec<_> = ["openai", "deepseek", "groq", "openrouter"]
        .into_iter()
        .map(|name| Arc::new(ScriptedProvider::new(name).failing()))
        .collect();
    let router = router(providers.clone());

    let err = router
        .call_with_fallback(TaskType::Coding, messages())
        .await
        .unwrap_err();

    match err {
        RouterError::Exhausted { task, attempts, .. } => {
            assert_eq!(task, TaskType::Coding);
            assert_eq!(attempts, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(providers.iter().all(|p| p.call_count() == 1));
}

#[tokio::test]
async fn primary_success_is_not_a_fallback() {
    let openai = Arc::new(ScriptedProvider::new("openai").always(GOOD_PLAN));
    let router = router(vec![openai.clone()]);

    let response = router
        .call_with_fallback(TaskType::Planning, messages())
        .await
        .unwrap();
    assert!(!response.used_fallback);
    assert_eq!(response.model, "gpt-4o-mini");
    assert!(response.confidence >= 0.6);

    let calls = openai.calls();
    let request = &calls[0];
    assert_eq!(request.max_tokens, TaskType::Planning.max_tokens());
    assert_eq!(request.model, "gpt-4o-mini");
}

#[tokio::test]
async fn empty_registry_is_a_configuration_error() {
    let router = router(vec![]);
    let err = router
        .call_with_fallback(TaskType::Intent, messages())
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::NoProviders));
}
