//! Scripted providers for tests.
//!
//! `ScriptedProvider` answers from a queue of canned results, optionally
//! falling back to a fixed answer or a responder closure once the queue is
//! drained. Every request is recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::TransportError;
use crate::provider::{ChatProvider, ChatRequest};

type Responder = Arc<dyn Fn(&ChatRequest) -> Result<String, TransportError> + Send + Sync>;

pub struct ScriptedProvider {
    name: String,
    model: String,
    queue: Mutex<VecDeque<Result<String, TransportError>>>,
    repeat: Option<Result<String, TransportError>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl std::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("name", &self.name)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            model: format!("{name}-model"),
            name,
            queue: Mutex::new(VecDeque::new()),
            repeat: None,
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a successful reply.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()))
    }

    /// Queue a transport failure.
    pub fn fail(self) -> Self {
        let err = TransportError::Network {
            provider: self.name.clone(),
            message: "connection refused".to_string(),
        };
        self.push(Err(err))
    }

    /// Answer `content` whenever the queue is empty.
    pub fn always(mut self, content: impl Into<String>) -> Self {
        self.repeat = Some(Ok(content.into()));
        self
    }

    /// Fail every call once the queue is empty.
    pub fn failing(mut self) -> Self {
        self.repeat = Some(Err(TransportError::Network {
            provider: self.name.clone(),
            message: "connection refused".to_string(),
        }));
        self
    }

    /// Compute replies from the request once the queue is empty.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&ChatRequest) -> Result<String, TransportError> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    fn push(self, result: Result<String, TransportError>) -> Self {
        self.queue.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        if let Some(responder) = &self.responder {
            return responder(request);
        }
        self.repeat.clone().unwrap_or_else(|| {
            Err(TransportError::EmptyResponse {
                provider: self.name.clone(),
            })
        })
    }
}
