//! Intent extraction.
//!
//! Questions are caught by a keyword check before any model is called. New
//! projects ask the intent model for a structured classification; existing
//! projects and every failure path use the keyword heuristic. This stage
//! never fails.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::PipelineContext;
use crate::extract::parse_json_payload;
use crate::obs;
use crate::provider::ChatMessage;
use crate::router::{RoutedResponse, Router, TaskType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Question,
    CreateProject,
    AddFeature,
    ModifyComponent,
    FixBug,
    StyleChange,
    RemoveFeature,
    General,
}

impl IntentKind {
    /// Lenient parse of a model-provided label.
    pub fn parse_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "question" | "conversation" | "chat" => Self::Question,
            "create_project" | "create" | "new_project" => Self::CreateProject,
            "add_feature" | "add" | "feature" => Self::AddFeature,
            "modify_component" | "modify" | "update" | "edit" => Self::ModifyComponent,
            "fix_bug" | "fix" | "bug" => Self::FixBug,
            "style_change" | "style" | "styling" => Self::StyleChange,
            "remove_feature" | "remove" | "delete" => Self::RemoveFeature,
            _ => Self::General,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    #[default]
    Heuristic,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    /// `0.0..=1.0`.
    pub confidence: f32,
    pub entities: Vec<String>,
    pub requires_new_files: bool,
    pub requires_existing_files: bool,
    #[serde(default)]
    pub source: IntentSource,
}

impl Intent {
    pub fn is_question(&self) -> bool {
        self.kind == IntentKind::Question
    }
}

/// Shape the intent model is asked to return. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelIntent {
    #[serde(rename = "type", alias = "intent")]
    kind: Option<String>,
    confidence: Option<f32>,
    entities: Option<Vec<String>>,
    #[serde(alias = "requiresNewFiles")]
    requires_new_files: Option<bool>,
    #[serde(alias = "requiresExistingFiles")]
    requires_existing_files: Option<bool>,
}

const QUESTION_PREFIXES: &[&str] = &[
    "what ", "what's", "whats ", "why ", "how do ", "how does ", "how can i ", "how to ",
    "can you explain", "could you explain", "explain ", "tell me ", "is it ", "is there ",
    "should i ", "who ", "when ", "where ", "which ", "difference between",
];

const BUILD_VERBS: &[&str] = &[
    "create", "build", "make", "add", "generate", "design", "implement", "change", "update",
    "fix", "remove", "delete", "style", "modify", "replace", "redesign", "convert",
];

const FIX_WORDS: &[&str] = &["fix", "bug", "error", "broken", "crash", "crashes", "issue", "wrong"];
const REMOVE_WORDS: &[&str] = &["remove", "delete", "drop", "hide"];
const STYLE_WORDS: &[&str] = &[
    "color", "colour", "colors", "style", "styling", "theme", "font", "dark", "light", "css",
    "spacing", "padding", "margin", "gradient", "animation",
];
const ADD_WORDS: &[&str] = &["add", "create", "new", "include", "integrate", "insert", "build"];
const MODIFY_WORDS: &[&str] = &["change", "update", "modify", "edit", "replace", "rename", "make", "move"];

/// Component names the heuristic picks out of a prompt.
const KNOWN_ENTITIES: &[(&str, &[&str])] = &[
    ("navbar", &["navbar", "navigation", "nav", "menu"]),
    ("header", &["header"]),
    ("hero", &["hero", "banner"]),
    ("features", &["features", "feature"]),
    ("pricing", &["pricing", "plans"]),
    ("testimonials", &["testimonials", "testimonial", "reviews"]),
    ("contact", &["contact"]),
    ("form", &["form"]),
    ("gallery", &["gallery", "portfolio"]),
    ("faq", &["faq"]),
    ("about", &["about"]),
    ("blog", &["blog"]),
    ("login", &["login", "signin"]),
    ("signup", &["signup", "register"]),
    ("dashboard", &["dashboard"]),
    ("sidebar", &["sidebar"]),
    ("modal", &["modal", "dialog"]),
    ("footer", &["footer"]),
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn any_word(tokens: &[String], set: &[&str]) -> bool {
    tokens.iter().any(|t| set.contains(&t.as_str()))
}

/// Keyword check for conversational prompts.
///
/// A prompt is a question when it opens like one (or ends with `?`) and does
/// not contain a build verb.
pub fn detect_question(prompt: &str) -> Option<Intent> {
    let lower = prompt.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let asks = QUESTION_PREFIXES.iter().any(|p| lower.starts_with(p)) || lower.ends_with('?');
    if !asks || any_word(&words(&lower), BUILD_VERBS) {
        return None;
    }
    Some(Intent {
        kind: IntentKind::Question,
        confidence: 0.95,
        entities: Vec::new(),
        requires_new_files: false,
        requires_existing_files: false,
        source: IntentSource::Heuristic,
    })
}

pub fn extract_entities(prompt: &str) -> Vec<String> {
    let tokens = words(prompt);
    KNOWN_ENTITIES
        .iter()
        .filter(|(_, aliases)| any_word(&tokens, aliases))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Keyword classification used when no model answer is available.
pub fn heuristic_intent(prompt: &str, is_new_project: bool) -> Intent {
    let tokens = words(prompt);
    let (kind, confidence) = if is_new_project {
        (IntentKind::CreateProject, 0.7)
    } else if any_word(&tokens, FIX_WORDS) {
        (IntentKind::FixBug, 0.6)
    } else if any_word(&tokens, REMOVE_WORDS) {
        (IntentKind::RemoveFeature, 0.6)
    } else if any_word(&tokens, STYLE_WORDS) {
        (IntentKind::StyleChange, 0.6)
    } else if any_word(&tokens, ADD_WORDS) {
        (IntentKind::AddFeature, 0.6)
    } else if any_word(&tokens, MODIFY_WORDS) {
        (IntentKind::ModifyComponent, 0.6)
    } else {
        (IntentKind::General, 0.4)
    };

    Intent {
        kind,
        confidence,
        entities: extract_entities(prompt),
        requires_new_files: matches!(kind, IntentKind::CreateProject | IntentKind::AddFeature),
        requires_existing_files: !is_new_project && kind != IntentKind::CreateProject,
        source: IntentSource::Heuristic,
    }
}

/// Parse a model reply into an intent, or `None` if it carries no usable type.
pub fn parse_model_intent(content: &str, prompt: &str, is_new_project: bool) -> Option<Intent> {
    let raw: ModelIntent = parse_json_payload(content)?;
    let kind = IntentKind::parse_label(raw.kind.as_deref()?);
    let fallback = heuristic_intent(prompt, is_new_project);
    Some(Intent {
        kind,
        confidence: raw.confidence.unwrap_or(0.8).clamp(0.0, 1.0),
        entities: raw.entities.unwrap_or(fallback.entities),
        requires_new_files: raw
            .requires_new_files
            .unwrap_or(matches!(kind, IntentKind::CreateProject | IntentKind::AddFeature)),
        requires_existing_files: raw.requires_existing_files.unwrap_or(!is_new_project),
        source: IntentSource::Model,
    })
}

const INTENT_SYSTEM_PROMPT: &str = "Classify the user's request for a React website builder. \
Reply with a single JSON object and nothing else: \
{\"type\": one of question | create_project | add_feature | modify_component | fix_bug | style_change | remove_feature | general, \
\"confidence\": number between 0 and 1, \
\"entities\": array of component or page names mentioned, \
\"requiresNewFiles\": boolean, \"requiresExistingFiles\": boolean}";

pub fn intent_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(INTENT_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ]
}

/// Intent plus the routed call that produced it, if any.
#[derive(Debug, Clone)]
pub struct IntentOutcome {
    pub intent: Intent,
    pub response: Option<RoutedResponse>,
}

pub async fn extract_intent(router: &Router, ctx: &PipelineContext) -> IntentOutcome {
    if let Some(intent) = detect_question(&ctx.prompt) {
        debug!(session_id = %ctx.session_id, "prompt classified as a question");
        return IntentOutcome {
            intent,
            response: None,
        };
    }

    let is_new = ctx.is_new_project();
    if !is_new {
        return IntentOutcome {
            intent: heuristic_intent(&ctx.prompt, false),
            response: None,
        };
    }

    match router
        .call_with_fallback(TaskType::Intent, intent_messages(&ctx.prompt))
        .await
    {
        Ok(response) => {
            let intent = parse_model_intent(&response.content, &ctx.prompt, true)
                .unwrap_or_else(|| heuristic_intent(&ctx.prompt, true));
            IntentOutcome {
                intent,
                response: Some(response),
            }
        }
        Err(e) => {
            obs::emit_stage_degraded(&ctx.session_id, "intent", &e);
            IntentOutcome {
                intent: heuristic_intent(&ctx.prompt, true),
                response: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::PipelineRequest;
    use crate::provider::fakes::ScriptedProvider;
    use crate::provider::{ChatProvider, ProviderRegistry};
    use crate::router::{ConfidenceWeights, RoutingTable};
    use genforge_state::FileOperation;

    fn router_with(provider: ScriptedProvider) -> Router {
        Router::new(
            ProviderRegistry::new(vec![Arc::new(provider) as Arc<dyn ChatProvider>]),
            RoutingTable::default(),
            ConfidenceWeights::default(),
        )
    }

    #[test]
    fn questions_are_detected_without_build_verbs() {
        let q = detect_question("What is a React hook?").unwrap();
        assert_eq!(q.kind, IntentKind::Question);
        assert_eq!(q.confidence, 0.95);
        assert!(detect_question("how does routing work in this app").is_some());

        assert!(detect_question("Build me a landing page for a bakery").is_none());
        assert!(detect_question("Can you add a pricing section?").is_none());
        assert!(detect_question("").is_none());
    }

    #[test]
    fn heuristic_for_new_project_is_create() {
        let intent = heuristic_intent("a landing page with a hero and pricing", true);
        assert_eq!(intent.kind, IntentKind::CreateProject);
        assert!(intent.requires_new_files);
        assert!(!intent.requires_existing_files);
        assert_eq!(intent.entities, vec!["hero", "pricing"]);
    }

    #[test]
    fn heuristic_for_existing_project_reads_keywords() {
        assert_eq!(heuristic_intent("fix the broken navbar", false).kind, IntentKind::FixBug);
        assert_eq!(
            heuristic_intent("remove the testimonials", false).kind,
            IntentKind::RemoveFeature
        );
        assert_eq!(
            heuristic_intent("use a darker color theme", false).kind,
            IntentKind::StyleChange
        );
        assert_eq!(
            heuristic_intent("add a contact form", false).kind,
            IntentKind::AddFeature
        );
        let general = heuristic_intent("hello there", false);
        assert_eq!(general.kind, IntentKind::General);
        assert!(general.requires_existing_files);
    }

    #[test]
    fn model_reply_is_parsed_leniently() {
        let reply = "```json\n{\"type\": \"add-feature\", \"confidence\": 1.7, \"requiresNewFiles\": true}\n```";
        let intent = parse_model_intent(reply, "add a faq", true).unwrap();
        assert_eq!(intent.kind, IntentKind::AddFeature);
        assert_eq!(intent.confidence, 1.0);
        assert_eq!(intent.entities, vec!["faq"]);
        assert_eq!(intent.source, IntentSource::Model);

        assert!(parse_model_intent("no json here", "x", true).is_none());
        assert!(parse_model_intent("{\"confidence\": 0.5}", "x", true).is_none());
    }

    #[tokio::test]
    async fn new_project_uses_model_answer() {
        let router = router_with(ScriptedProvider::new("groq").always(
            "{\"type\": \"create_project\", \"confidence\": 0.9, \"entities\": [\"hero\"]}",
        ));
        let ctx = PipelineContext::new(PipelineRequest::new("ws", "Build a bakery site"), vec![]);
        let outcome = extract_intent(&router, &ctx).await;
        assert_eq!(outcome.intent.kind, IntentKind::CreateProject);
        assert_eq!(outcome.intent.source, IntentSource::Model);
        assert!(outcome.response.is_some());
    }

    #[tokio::test]
    async fn failure_falls_back_to_heuristic() {
        let router = router_with(ScriptedProvider::new("groq").failing());
        let ctx = PipelineContext::new(PipelineRequest::new("ws", "Build a bakery site"), vec![]);
        let outcome = extract_intent(&router, &ctx).await;
        assert_eq!(outcome.intent.kind, IntentKind::CreateProject);
        assert_eq!(outcome.intent.source, IntentSource::Heuristic);
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn existing_project_skips_the_model() {
        let provider = Arc::new(ScriptedProvider::new("groq").always("{}"));
        let router = Router::new(
            ProviderRegistry::new(vec![provider.clone() as Arc<dyn ChatProvider>]),
            RoutingTable::default(),
            ConfidenceWeights::default(),
        );
        let ctx = PipelineContext::new(
            PipelineRequest::new("ws", "add a footer"),
            vec![FileOperation::update("src/App.tsx", "export default function App() {}")],
        );
        let outcome = extract_intent(&router, &ctx).await;
        assert_eq!(outcome.intent.kind, IntentKind::AddFeature);
        assert_eq!(provider.call_count(), 0);
    }
}
