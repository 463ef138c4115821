//! Model Client Abstraction
//!
//! Generic interface for the language-model runtime. The pipeline only ever
//! sends a single user-role message per call and reads the reply content.
//! Production uses `OllamaClient`; tests use `FakeModelClient`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Reply from a chat call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
}

/// Model client errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model runtime not available: {0}")]
    NotAvailable(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Language-model runtime contract
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Names of the locally installed models
    async fn list_models(&self) -> Result<Vec<String>, ModelError>;

    /// Download a model, returning once it is installed
    async fn pull_model(&self, name: &str) -> Result<(), ModelError>;

    /// Single non-streaming chat completion
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatReply, ModelError>;
}

/// Does `installed` satisfy a request for `wanted`?
///
/// Ollama reports names with a tag (`codellama:latest`); users usually ask
/// for the bare name.
pub fn model_matches(installed: &str, wanted: &str) -> bool {
    if installed == wanted {
        return true;
    }
    let installed_base = installed.split(':').next().unwrap_or(installed);
    if wanted.contains(':') {
        return false;
    }
    installed_base == wanted
}

/// A chat call recorded by `FakeModelClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedChat {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Fake model client for testing
///
/// Replies are consumed in order; the last one repeats once the queue is
/// down to a single entry.
pub struct FakeModelClient {
    models: Vec<String>,
    offline: Option<ModelError>,
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<RecordedChat>>,
    pulls: Mutex<Vec<String>>,
}

impl FakeModelClient {
    /// Create a fake client with pre-defined chat replies
    pub fn new(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            models: vec!["codellama:latest".to_string()],
            offline: None,
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            pulls: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with the same text
    pub fn always(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    /// Always fail with the same error
    pub fn always_error(error: ModelError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Replace the installed model list
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Fail `list_models` and `pull_model` with `error`, as an unreachable server would
    pub fn offline(mut self, error: ModelError) -> Self {
        self.offline = Some(error);
        self
    }

    /// Number of chat calls made
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// All chat calls made so far
    pub fn calls(&self) -> Vec<RecordedChat> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Models pulled so far
    pub fn pulls(&self) -> Vec<String> {
        self.pulls.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for FakeModelClient {
    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        match &self.offline {
            Some(e) => Err(e.clone()),
            None => Ok(self.models.clone()),
        }
    }

    async fn pull_model(&self, name: &str) -> Result<(), ModelError> {
        if let Some(e) = &self.offline {
            return Err(e.clone());
        }
        if let Ok(mut pulls) = self.pulls.lock() {
            pulls.push(name.to_string());
        }
        Ok(())
    }

    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatReply, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedChat {
                model: model.to_string(),
                messages: messages.to_vec(),
            });
        }

        let mut replies = self
            .replies
            .lock()
            .map_err(|_| ModelError::InvalidResponse("fake client poisoned".to_string()))?;
        let next = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        match next {
            Some(reply) => reply.map(|content| ChatReply { content }),
            None => Err(ModelError::EmptyResponse),
        }
    }
}
