//! Ollama Local LLM Client
//!
//! HTTP client for the local Ollama API.
//!
//! Endpoints used:
//! - GET /api/tags - list installed models
//! - POST /api/pull - download a model (non-streaming)
//! - POST /api/chat - chat completion (non-streaming)

use crate::config::ModelSettings;
use crate::model_client::{ChatMessage, ChatReply, ModelClient, ModelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Timeout for listing models
pub const TAGS_TIMEOUT_MS: u64 = 5000;

/// Model downloads can take a very long time on slow connections
pub const PULL_TIMEOUT_SECS: u64 = 3600;

/// Model info from /api/tags
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

/// Response from /api/tags
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaModel>,
}

/// Request for /api/pull
#[derive(Debug, Clone, Serialize)]
pub struct PullRequest {
    pub name: String,
    pub stream: bool,
}

/// Final status from /api/pull
#[derive(Debug, Clone, Deserialize)]
pub struct PullResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request for /api/chat
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// Response from /api/chat (non-streaming)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
}

/// Ollama client for local LLM calls
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client with custom URL and request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(&settings.endpoint, settings.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, e: reqwest::Error, timeout: Duration) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(timeout.as_secs())
        } else if e.is_connect() {
            ModelError::NotAvailable(e.to_string())
        } else {
            ModelError::Http(e.to_string())
        }
    }

    /// Turn a non-success response into an error, keeping Ollama's message
    async fn error_for_status(resp: reqwest::Response, model: &str) -> ModelError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);

        if status == reqwest::StatusCode::NOT_FOUND {
            ModelError::ModelNotFound(model.to_string())
        } else {
            ModelError::Http(format!("status {}: {}", status, message))
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let timeout = Duration::from_millis(TAGS_TIMEOUT_MS);
        let url = format!("{}/api/tags", self.base_url);

        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        if !resp.status().is_success() {
            return Err(Self::error_for_status(resp, "").await);
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn pull_model(&self, name: &str) -> Result<(), ModelError> {
        let timeout = Duration::from_secs(PULL_TIMEOUT_SECS);
        let url = format!("{}/api/pull", self.base_url);
        let request = PullRequest {
            name: name.to_string(),
            stream: false,
        };

        debug!("Pulling model {} from {}", name, self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        if !resp.status().is_success() {
            return Err(Self::error_for_status(resp, name).await);
        }

        let pull: PullResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        if let Some(error) = pull.error {
            return Err(ModelError::Http(error));
        }
        if pull.status != "success" {
            return Err(ModelError::InvalidResponse(format!(
                "unexpected pull status '{}'",
                pull.status
            )));
        }
        Ok(())
    }

    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatReply, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, self.timeout))?;

        if !resp.status().is_success() {
            return Err(Self::error_for_status(resp, model).await);
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        debug!(
            "Chat reply from {}: {} chars (done={})",
            model,
            chat.message.content.len(),
            chat.done
        );
        Ok(ChatReply {
            content: chat.message.content,
        })
    }
}
