//! Rule Engine Trait Abstraction
//!
//! The execution stage drives a forward-chaining engine through this
//! interface:
//! - `RuleEngine::new_environment` hands out a fresh, isolated environment
//! - `Environment` loads source, resets facts, runs and lists facts
//!
//! Production code uses `ClipsProcessEngine`, which drives the CLIPS
//! command-line interpreter as a child process.
//! Test code uses `FakeRuleEngine` with scripted programs.

mod clips_process;
mod fake;

pub use clips_process::{
    parse_load_transcript, parse_run_transcript, ClipsProcessEngine, LoadTranscript, RunTranscript,
};
pub use fake::{FakeProgram, FakeRuleEngine};

use async_trait::async_trait;

/// Outcome of one inference run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of rule firings
    pub rules_fired: u64,
    /// Activations still on the agenda when the run stopped
    pub pending_activations: usize,
    /// Lines the program printed while running
    pub output: Vec<String>,
}

/// Rule engine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("rule engine not available: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Load(String),

    #[error("{0}")]
    Runtime(String),

    #[error("rule engine timed out after {0} seconds")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

/// A single isolated evaluation environment
#[async_trait]
pub trait Environment: Send {
    /// Load (compile) source. Fails on syntax or semantic errors.
    async fn load(&mut self, source: &str) -> Result<(), EngineError>;

    /// Initialise the fact base from the loaded `deffacts`
    async fn reset(&mut self) -> Result<(), EngineError>;

    /// Fire rules until none are eligible, or until `limit` firings
    async fn run(&mut self, limit: Option<u64>) -> Result<RunSummary, EngineError>;

    /// Current fact base, in the engine's enumeration order
    async fn facts(&mut self) -> Result<Vec<String>, EngineError>;
}

/// Factory for environments
#[async_trait]
pub trait RuleEngine: Send + Sync {
    async fn new_environment(&self) -> Result<Box<dyn Environment>, EngineError>;
}
