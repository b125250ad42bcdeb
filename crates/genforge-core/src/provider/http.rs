//! OpenAI-compatible HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::domain::{ConfigError, TransportError};
use crate::provider::{ChatProvider, ChatRequest};

/// Error bodies are cut to this many chars before they land in errors.
const MAX_ERROR_BODY: usize = 500;

/// One client for every provider; `reqwest::Client` pools connections and is
/// cheap to clone.
pub fn shared_client() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(concat!("genforge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConfigError::Invalid(format!("could not build HTTP client: {e}")))
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct HttpChatProvider {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    api_key: Option<String>,
    default_model: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatProvider")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpChatProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig, default_timeout_secs: u64) -> Self {
        Self {
            client,
            name: config.name.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            default_model: config.default_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(default_timeout_secs)),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                provider: self.name.clone(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            TransportError::Network {
                provider: self.name.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(provider = %self.name, model = %request.model, "sending chat completion");
        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                provider: self.name.clone(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                TransportError::Decode {
                    provider: self.name.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| TransportError::EmptyResponse {
                provider: self.name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + length {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}/v1"), handle)
    }

    fn provider(base_url: String) -> HttpChatProvider {
        let config = ProviderConfig {
            name: "local".into(),
            base_url,
            api_key: Some("sk-test".into()),
            api_key_env: None,
            default_model: "m".into(),
            timeout_secs: Some(5),
        };
        HttpChatProvider::new(shared_client().unwrap(), &config, 60)
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: 10,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn reads_first_choice_and_sends_bearer_key() {
        let (base, server) =
            serve_once("200 OK", r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#).await;
        let content = provider(base).complete(&request()).await.unwrap();
        assert_eq!(content, "hi there");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions"));
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains("\"max_tokens\":10"));
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let (base, _server) = serve_once("429 Too Many Requests", r#"{"error":"rate limited"}"#).await;
        let err = provider(base).complete(&request()).await.unwrap_err();
        match err {
            TransportError::Http { status, body, .. } => {
                assert_eq!(status, 429);
                assert!(body.contains("rate limited"));
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_content_is_transport_failure() {
        let (base, _server) = serve_once("200 OK", r#"{"choices":[{"message":{"content":"  "}}]}"#).await;
        let err = provider(base).complete(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::EmptyResponse { .. }));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let p = provider("https://api.example.com/v1/".into());
        assert_eq!(p.endpoint(), "https://api.example.com/v1/chat/completions");
        assert!(!format!("{p:?}").contains("sk-test"));
    }
}
