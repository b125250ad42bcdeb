//! Heuristic confidence scoring for raw model responses.
//!
//! Scores start at a baseline and are clamped to `[0, 1]`. Every constant is
//! carried by `ConfidenceWeights` so deployments can tune them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::{extract_code_blocks, extract_json_payload};
use crate::router::TaskType;
use crate::validator::scanner::{balance, ScanMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub baseline: f32,
    pub placeholder_penalty: f32,
    pub structured_reward: f32,
    pub structured_penalty: f32,
    pub code_block_reward: f32,
    pub unbalanced_penalty: f32,
    pub missing_block_penalty: f32,
    pub validity_field_reward: f32,
    /// Responses shorter than this (in chars, trimmed) are likely truncated.
    pub min_length: usize,
    pub short_penalty: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            baseline: 0.5,
            placeholder_penalty: 0.3,
            structured_reward: 0.3,
            structured_penalty: 0.3,
            code_block_reward: 0.3,
            unbalanced_penalty: 0.25,
            missing_block_penalty: 0.4,
            validity_field_reward: 0.3,
            min_length: 20,
            short_penalty: 0.3,
        }
    }
}

/// Markers of elided or unfinished output. Matched case-insensitively.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "rest of the code",
    "rest of code",
    "...existing code",
    "// ...",
    "/* ... */",
    "todo: implement",
    "implement this",
    "your code here",
];

static VALIDITY_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"?(valid|is_valid|isValid)"?\s*:\s*(true|false)"#).expect("validity pattern")
});

pub fn has_placeholder(content: &str) -> bool {
    let lower = content.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Score `content` as a response to `task`.
pub fn score_response(task: TaskType, content: &str, weights: &ConfidenceWeights) -> f32 {
    let mut score = weights.baseline;

    if has_placeholder(content) {
        score -= weights.placeholder_penalty;
    }

    match task {
        TaskType::Intent | TaskType::Planning => {
            let parsed = extract_json_payload(content)
                .and_then(|p| serde_json::from_str::<serde_json::Value>(&p).ok())
                .is_some_and(|v| v.is_object());
            if parsed {
                score += weights.structured_reward;
            } else {
                score -= weights.structured_penalty;
            }
        }
        TaskType::Coding | TaskType::Repair => {
            let blocks = extract_code_blocks(content);
            if blocks.iter().any(|b| b.path.is_some()) {
                score += weights.code_block_reward;
                let unbalanced = blocks.iter().any(|b| {
                    !balance(&b.body, ScanMode::for_language(&b.language))
                        .braces
                        .is_balanced()
                });
                if unbalanced {
                    score -= weights.unbalanced_penalty;
                }
            } else {
                score -= weights.missing_block_penalty;
            }
        }
        TaskType::Validation => {
            if VALIDITY_FIELD.is_match(content) {
                score += weights.validity_field_reward;
            }
        }
        TaskType::Conversation => {}
    }

    if content.trim().chars().count() < weights.min_length {
        score -= weights.short_penalty;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(task: TaskType, content: &str) -> f32 {
        score_response(task, content, &ConfidenceWeights::default())
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn structured_payload_rewarded() {
        let good = score(TaskType::Intent, "```json\n{\"type\": \"create_project\", \"confidence\": 0.9}\n```");
        assert!(approx(good, 0.8), "{good}");
        let bad = score(TaskType::Planning, "I think you should build a landing page with a hero.");
        assert!(approx(bad, 0.2), "{bad}");
    }

    #[test]
    fn labeled_code_block_rewarded() {
        let content = "```tsx:src/App.tsx\nexport default function App() { return null; }\n```";
        assert!(approx(score(TaskType::Coding, content), 0.8));
    }

    #[test]
    fn unbalanced_block_penalized() {
        let content = "```tsx:src/App.tsx\nexport default function App() { return null;\n```";
        assert!(approx(score(TaskType::Coding, content), 0.55));
    }

    #[test]
    fn missing_blocks_and_placeholders_penalized() {
        let content = "```tsx\nfunction App() {\n  // ... rest of the code\n}\n```";
        assert!(approx(score(TaskType::Repair, content), 0.0));
    }

    #[test]
    fn validity_field_rewarded() {
        assert!(approx(score(TaskType::Validation, "{\"valid\": true, \"issues\": []}"), 0.8));
    }

    #[test]
    fn short_responses_penalized_and_clamped() {
        assert!(approx(score(TaskType::Conversation, "ok"), 0.2));
        assert!(score(TaskType::Coding, "") >= 0.0);
    }
}
