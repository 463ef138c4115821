//! Execution Stage - runs generated source in a fresh environment
//!
//! Never returns an error: every failure becomes `ExecutionResult::Failure`
//! with an "Execution error: " prefix.
//!
//! Steps:
//! 1. new environment (nothing inherited from earlier turns)
//! 2. load
//! 3. reset (deffacts -> working memory)
//! 4. run to quiescence, bounded by the firing limit
//! 5. list facts

use crate::config::EngineSettings;
use crate::engine::{EngineError, RuleEngine};
use crate::types::{ExecutionResult, GeneratedSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ERROR_PREFIX: &str = "Execution error: ";

/// Resource limits applied to each run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Firing ceiling, `None` for unbounded
    pub max_rule_firings: Option<u64>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl ExecutionLimits {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            max_rule_firings: settings.firing_limit(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_rule_firings: None,
        }
    }
}

fn failure(detail: impl std::fmt::Display) -> ExecutionResult {
    ExecutionResult::failure(format!("{}{}", ERROR_PREFIX, detail))
}

pub struct Executor {
    engine: Arc<dyn RuleEngine>,
    limits: ExecutionLimits,
}

impl Executor {
    pub fn new(engine: Arc<dyn RuleEngine>, limits: ExecutionLimits) -> Self {
        Self { engine, limits }
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    pub async fn execute(&self, source: &GeneratedSource) -> ExecutionResult {
        match self.try_execute(source).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Execution failed: {}", e);
                failure(e)
            }
        }
    }

    async fn try_execute(&self, source: &GeneratedSource) -> Result<ExecutionResult, EngineError> {
        let mut env = self.engine.new_environment().await?;

        if source.is_empty() {
            return Err(EngineError::Load("no rule-engine source to load".to_string()));
        }
        env.load(source.as_str()).await?;
        debug!("Loaded {} lines", source.line_count());

        env.reset().await?;

        let summary = env.run(self.limits.max_rule_firings).await?;
        if let Some(limit) = self.limits.max_rule_firings {
            if summary.rules_fired >= limit && summary.pending_activations > 0 {
                return Ok(failure(format!(
                    "rule firing limit of {} reached with {} activations still pending",
                    limit, summary.pending_activations
                )));
            }
        }

        let facts = env.facts().await?;
        info!(
            "Run complete: {} rules fired, {} facts",
            summary.rules_fired,
            facts.len()
        );

        Ok(ExecutionResult::Success {
            rules_fired: summary.rules_fired,
            facts,
            output: summary.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FakeProgram, FakeRuleEngine};

    fn executor(engine: FakeRuleEngine, limits: ExecutionLimits) -> Executor {
        Executor::new(Arc::new(engine), limits)
    }

    #[tokio::test]
    async fn test_empty_source_fails_at_load() {
        let engine = FakeRuleEngine::new();
        let exec = executor(engine.clone(), ExecutionLimits::default());

        let result = exec.execute(&GeneratedSource::new("")).await;
        assert_eq!(
            result,
            ExecutionResult::failure("Execution error: no rule-engine source to load")
        );
        assert!(engine.loads().is_empty());
    }

    #[tokio::test]
    async fn test_load_error_is_prefixed() {
        let engine = FakeRuleEngine::new()
            .with_program("(defrule", FakeProgram::load_error("[PRNTUTIL2] Syntax Error"));
        let exec = executor(engine, ExecutionLimits::default());

        let result = exec.execute(&GeneratedSource::new("(defrule")).await;
        assert_eq!(
            result,
            ExecutionResult::failure("Execution error: [PRNTUTIL2] Syntax Error")
        );
    }

    #[tokio::test]
    async fn test_runtime_error_is_failure() {
        let engine = FakeRuleEngine::new().with_program(
            "P",
            FakeProgram::fires(1).runtime_error("[PRCCODE4] Execution halted"),
        );
        let exec = executor(engine, ExecutionLimits::default());

        match exec.execute(&GeneratedSource::new("P")).await {
            ExecutionResult::Failure { message } => {
                assert!(message.starts_with("Execution error: "));
                assert!(message.contains("PRCCODE4"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_with_no_facts_is_not_an_error() {
        let engine = FakeRuleEngine::new().with_program("P", FakeProgram::fires(0));
        let exec = executor(engine, ExecutionLimits::default());

        let result = exec.execute(&GeneratedSource::new("P")).await;
        assert_eq!(
            result,
            ExecutionResult::Success {
                rules_fired: 0,
                facts: vec![],
                output: vec![],
            }
        );
        assert!(result.render().contains("No facts generated."));
    }

    #[tokio::test]
    async fn test_firing_limit_exceeded_is_failure() {
        let engine = FakeRuleEngine::new().with_program("loop", FakeProgram::fires(u64::MAX / 2));
        let exec = executor(
            engine,
            ExecutionLimits {
                max_rule_firings: Some(100),
            },
        );

        match exec.execute(&GeneratedSource::new("loop")).await {
            ExecutionResult::Failure { message } => {
                assert!(message.contains("rule firing limit of 100 reached"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exactly_at_limit_is_success() {
        let engine = FakeRuleEngine::new().with_program("P", FakeProgram::fires(5));
        let exec = executor(
            engine,
            ExecutionLimits {
                max_rule_firings: Some(5),
            },
        );

        let result = exec.execute(&GeneratedSource::new("P")).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_unavailable_engine_is_failure() {
        struct Broken;

        #[async_trait::async_trait]
        impl RuleEngine for Broken {
            async fn new_environment(
                &self,
            ) -> Result<Box<dyn crate::engine::Environment>, EngineError> {
                Err(EngineError::Unavailable("clips not found".to_string()))
            }
        }

        let exec = Executor::new(Arc::new(Broken), ExecutionLimits::unbounded());
        let result = exec.execute(&GeneratedSource::new("(facts)")).await;
        assert_eq!(
            result,
            ExecutionResult::failure("Execution error: rule engine not available: clips not found")
        );
    }
}
