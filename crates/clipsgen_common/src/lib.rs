//! Clipsgen Common - the generate, sanitize, execute, interpret pipeline
//!
//! A language model turns a problem description into a CLIPS program, the
//! program runs in a fresh rule-engine environment, and the model explains
//! the resulting facts. Both external systems sit behind traits
//! (`ModelClient`, `RuleEngine`) with real and fake implementations.

pub mod config;
pub mod engine;
pub mod execution;
pub mod generation;
pub mod interpretation;
pub mod model_client;
pub mod ollama;
pub mod prompts;
pub mod sanitizer;
pub mod types;

pub use config::{ClipsgenConfig, ColorMode, ConfigError};
pub use engine::{ClipsProcessEngine, EngineError, Environment, RuleEngine, RunSummary};
pub use execution::{ExecutionLimits, Executor};
pub use generation::{GenerationConfig, GenerationError, Generator};
pub use interpretation::{InterpretationConfig, Interpreter};
pub use model_client::{ChatMessage, ChatReply, ModelClient, ModelError};
pub use ollama::OllamaClient;
pub use sanitizer::sanitize;
pub use types::{ExecutionResult, GeneratedSource, Interpretation, ProblemStatement};
