//! Generation Stage - problem statement to CLIPS source
//!
//! One chat call with the generation prompt, then the sanitizer. No retries:
//! the session decides what to do with a failure.

use crate::config::ClipsgenConfig;
use crate::model_client::{ChatMessage, ModelClient, ModelError};
use crate::prompts;
use crate::sanitizer::sanitize;
use crate::types::{GeneratedSource, ProblemStatement};
use std::sync::Arc;
use tracing::{debug, info};

/// Model and prompt used for code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub model: String,
    /// Template containing `{problem}`
    pub template: String,
}

impl GenerationConfig {
    pub fn from_config(config: &ClipsgenConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            template: config.prompts.generation.clone(),
        }
    }
}

/// Code generation failed; fatal to the turn only
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),
}

pub struct Generator {
    client: Arc<dyn ModelClient>,
    config: GenerationConfig,
}

impl Generator {
    pub fn new(client: Arc<dyn ModelClient>, config: GenerationConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Ask the model for a program and sanitize the reply
    pub async fn generate(
        &self,
        problem: &ProblemStatement,
    ) -> Result<GeneratedSource, GenerationError> {
        let prompt = prompts::render_generation(&self.config.template, problem.as_str());
        debug!("Generation prompt: {} chars", prompt.len());

        let reply = self
            .client
            .chat(&self.config.model, &[ChatMessage::user(prompt)])
            .await?;

        let source = GeneratedSource::new(sanitize(&reply.content));
        info!(
            "Generated {} lines of CLIPS from {} raw lines",
            source.line_count(),
            reply.content.lines().count()
        );
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_client::FakeModelClient;

    fn config() -> GenerationConfig {
        GenerationConfig {
            model: "codellama".to_string(),
            template: "Write CLIPS for: {problem}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_sanitizes_reply() {
        let client = Arc::new(FakeModelClient::always(
            "Here you go:\n```clips\n(deffacts f (age 20))\n```\nEnjoy!",
        ));
        let generator = Generator::new(client.clone(), config());

        let source = generator
            .generate(&ProblemStatement::new("adult check"))
            .await
            .unwrap();
        assert_eq!(source.as_str(), "(deffacts f (age 20))");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "codellama");
        assert_eq!(calls[0].messages, vec![ChatMessage::user("Write CLIPS for: adult check")]);
    }

    #[tokio::test]
    async fn test_generate_prose_reply_is_empty_source() {
        let client = Arc::new(FakeModelClient::always("I cannot write code today."));
        let generator = Generator::new(client, config());

        let source = generator.generate(&ProblemStatement::new("x")).await.unwrap();
        assert!(source.is_empty());
    }

    #[tokio::test]
    async fn test_generate_model_fault_is_error_without_retry() {
        let client = Arc::new(FakeModelClient::always_error(ModelError::NotAvailable(
            "connection refused".to_string(),
        )));
        let generator = Generator::new(client.clone(), config());

        let err = generator.generate(&ProblemStatement::new("x")).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Model(ModelError::NotAvailable("connection refused".to_string()))
        );
        assert_eq!(client.call_count(), 1);
    }
}
