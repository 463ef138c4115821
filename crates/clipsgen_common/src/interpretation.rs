//! Interpretation Stage - explains an execution result in plain language
//!
//! Purely explanatory, so it never fails: a model fault yields a local
//! placeholder instead.

use crate::config::ClipsgenConfig;
use crate::model_client::{ChatMessage, ModelClient};
use crate::prompts;
use crate::types::{ExecutionResult, Interpretation, ProblemStatement};
use std::sync::Arc;
use tracing::{debug, warn};

/// Model and prompt used for interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretationConfig {
    pub model: String,
    /// Template containing `{problem}` and `{output}`
    pub template: String,
}

impl InterpretationConfig {
    pub fn from_config(config: &ClipsgenConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            template: config.prompts.interpretation.clone(),
        }
    }
}

pub struct Interpreter {
    client: Arc<dyn ModelClient>,
    config: InterpretationConfig,
}

impl Interpreter {
    pub fn new(client: Arc<dyn ModelClient>, config: InterpretationConfig) -> Self {
        Self { client, config }
    }

    pub async fn interpret(
        &self,
        problem: &ProblemStatement,
        result: &ExecutionResult,
    ) -> Interpretation {
        let prompt =
            prompts::render_interpretation(&self.config.template, problem.as_str(), &result.render());
        debug!("Interpretation prompt: {} chars", prompt.len());

        match self
            .client
            .chat(&self.config.model, &[ChatMessage::user(prompt)])
            .await
        {
            Ok(reply) if !reply.content.trim().is_empty() => Interpretation {
                text: reply.content.trim().to_string(),
                degraded: false,
            },
            Ok(_) => {
                warn!("Interpretation reply was empty");
                placeholder("the model returned an empty response")
            }
            Err(e) => {
                warn!("Interpretation failed: {}", e);
                placeholder(e)
            }
        }
    }
}

fn placeholder(cause: impl std::fmt::Display) -> Interpretation {
    Interpretation {
        text: format!("Could not interpret results: {}", cause),
        degraded: true,
    }
}
