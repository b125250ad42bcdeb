//! Provider router.
//!
//! Maps a `TaskType` to an ordered list of provider/model candidates and runs
//! them through `try_in_order`: a transport failure or a response scoring
//! under the task's confidence threshold moves on to the next candidate.
//!
//! Candidate order: the routing entry's primary (if that provider is
//! configured), then its fallback, then every other configured provider with
//! its default model. A provider appears at most once.

pub mod confidence;
pub mod fallback;
pub mod table;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::ForgeConfig;
use crate::domain::{ConfigError, RouterError};
use crate::obs;
use crate::provider::{ChatMessage, ChatProvider, ChatRequest, ProviderRegistry};

pub use confidence::{score_response, ConfidenceWeights};
pub use fallback::{try_in_order, Accepted, FallbackError};
pub use table::{FallbackTarget, RoutingEntry, RoutingTable, TaskType};

/// Accepted response plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    pub used_fallback: bool,
    pub confidence: f32,
    /// Candidates tried, including the accepted one.
    pub attempts: usize,
}

/// One provider/model pair to try.
#[derive(Clone)]
pub struct Candidate {
    pub provider: Arc<dyn ChatProvider>,
    pub model: String,
    pub is_primary: bool,
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("is_primary", &self.is_primary)
            .finish()
    }
}

struct Completion {
    content: String,
    latency_ms: u64,
    confidence: f32,
}

#[derive(Debug, Clone)]
pub struct Router {
    registry: ProviderRegistry,
    table: RoutingTable,
    weights: ConfidenceWeights,
}

impl Router {
    pub fn new(registry: ProviderRegistry, table: RoutingTable, weights: ConfidenceWeights) -> Self {
        Self {
            registry,
            table,
            weights,
        }
    }

    /// Router over HTTP providers built from `config`.
    pub fn from_config(config: &ForgeConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            ProviderRegistry::from_config(config)?,
            config.routing.clone(),
            config.scoring.clone(),
        ))
    }

    pub fn has_providers(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Ordered, deduplicated candidates for `task`.
    pub fn candidates(&self, task: TaskType) -> Vec<Candidate> {
        let entry = self.table.entry(task);
        let mut out: Vec<Candidate> = Vec::new();
        let mut push = |provider: &Arc<dyn ChatProvider>, model: &str, is_primary: bool| {
            if out.iter().all(|c| c.provider.name() != provider.name()) {
                out.push(Candidate {
                    provider: Arc::clone(provider),
                    model: model.to_string(),
                    is_primary,
                });
            }
        };

        if let Some(primary) = self.registry.get(&entry.provider) {
            push(primary, &entry.model, true);
        }
        if let Some(target) = &entry.fallback {
            if let Some(provider) = self.registry.get(&target.provider) {
                push(provider, &target.model, false);
            }
        }
        for provider in self.registry.iter() {
            push(provider, provider.default_model(), false);
        }
        out
    }

    /// Run `messages` for `task` through the fallback chain.
    pub async fn call_with_fallback(
        &self,
        task: TaskType,
        messages: Vec<ChatMessage>,
    ) -> Result<RoutedResponse, RouterError> {
        let candidates = self.candidates(task);
        let threshold = self.table.entry(task).confidence_threshold;
        let weights = &self.weights;
        let total = candidates.len();

        let outcome = try_in_order(
            &candidates,
            |index, candidate| {
                let request = ChatRequest {
                    model: candidate.model.clone(),
                    messages: messages.clone(),
                    max_tokens: task.max_tokens(),
                    temperature: task.temperature(),
                };
                async move {
                    let started = Instant::now();
                    let result = candidate.provider.complete(&request).await;
                    let latency_ms = started.elapsed().as_millis() as u64;
                    match result {
                        Ok(content) => {
                            let confidence = score_response(task, &content, weights);
                            Ok(Completion {
                                content,
                                latency_ms,
                                confidence,
                            })
                        }
                        Err(err) => {
                            if index + 1 < total {
                                obs::emit_fallback(
                                    task.as_str(),
                                    candidate.provider.name(),
                                    &candidate.model,
                                    &err.to_string(),
                                );
                            }
                            Err(err)
                        }
                    }
                }
            },
            |index, candidate, completion: &Completion| {
                if completion.confidence >= threshold {
                    return true;
                }
                obs::emit_low_confidence(
                    task.as_str(),
                    candidate.provider.name(),
                    completion.confidence,
                    threshold,
                );
                if index + 1 < total {
                    obs::emit_fallback(
                        task.as_str(),
                        candidate.provider.name(),
                        &candidate.model,
                        "low confidence",
                    );
                }
                false
            },
        )
        .await;

        match outcome {
            Ok(Accepted {
                index,
                value,
                tried,
            }) => {
                let candidate = &candidates[index];
                Ok(RoutedResponse {
                    content: value.content,
                    provider: candidate.provider.name().to_string(),
                    model: candidate.model.clone(),
                    latency_ms: value.latency_ms,
                    used_fallback: !candidate.is_primary,
                    confidence: value.confidence,
                    attempts: tried,
                })
            }
            Err(FallbackError::NoCandidates) => Err(RouterError::NoProviders),
            Err(FallbackError::Exhausted { tried, last }) => Err(RouterError::Exhausted {
                task,
                attempts: tried,
                last,
            }),
        }
    }
}
