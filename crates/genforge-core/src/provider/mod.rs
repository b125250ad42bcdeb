//! Chat-completion providers.
//!
//! Every provider speaks the same contract: a `ChatRequest` goes out, the
//! first choice's message content comes back. The router treats them as
//! interchangeable.

pub mod fakes;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ForgeConfig;
use crate::domain::{ConfigError, TransportError};

pub use http::HttpChatProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body of the uniform chat-completion contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A remote model endpoint.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Name used in routing entries (`openai`, `groq`, ...).
    fn name(&self) -> &str;

    /// Model used when this provider is tried outside its routing entry.
    fn default_model(&self) -> &str;

    /// Run one completion and return the first choice's content.
    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

/// Configured providers, in configuration order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ChatProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Later providers with an already-registered name are ignored.
    pub fn new(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        let mut registry = Self::empty();
        for provider in providers {
            if registry.get(provider.name()).is_none() {
                registry.providers.push(provider);
            }
        }
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// HTTP providers for every configured entry, sharing one client.
    pub fn from_config(config: &ForgeConfig) -> Result<Self, ConfigError> {
        let client = http::shared_client()?;
        let timeout = config.pipeline.request_timeout_secs;
        let providers = config
            .configured_providers()
            .map(|p| Arc::new(HttpChatProvider::new(client.clone(), p, timeout)) as Arc<dyn ChatProvider>)
            .collect();
        Ok(Self::new(providers))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ChatProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ChatProvider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fakes::ScriptedProvider;

    #[test]
    fn duplicate_names_keep_first() {
        let a: Arc<dyn ChatProvider> = Arc::new(ScriptedProvider::new("groq").with_model("first"));
        let b: Arc<dyn ChatProvider> = Arc::new(ScriptedProvider::new("groq").with_model("second"));
        let registry = ProviderRegistry::new(vec![a, b]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("groq").unwrap().default_model(), "first");
    }

    #[test]
    fn request_serializes_to_uniform_contract() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            max_tokens: 500,
            temperature: 0.1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 500);
    }
}
