//! Fake rule engine for testing
//!
//! Programs are scripted by exact source text. Environments keep every
//! program loaded into them, so code that reused an environment across
//! turns would see facts leak from one program into the next.

use super::{EngineError, Environment, RuleEngine, RunSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted behaviour for one program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeProgram {
    /// Firings the program would make if unbounded
    pub firings: u64,
    /// Facts present after reset
    pub initial_facts: Vec<String>,
    /// Facts asserted by rule firings
    pub derived_facts: Vec<String>,
    /// Lines printed while running
    pub output: Vec<String>,
    /// Error raised at load time
    pub load_error: Option<String>,
    /// Error raised while running
    pub runtime_error: Option<String>,
}

impl FakeProgram {
    pub fn fires(firings: u64) -> Self {
        Self {
            firings,
            ..Default::default()
        }
    }

    pub fn load_error(message: &str) -> Self {
        Self {
            load_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn runtime_error(mut self, message: &str) -> Self {
        self.runtime_error = Some(message.to_string());
        self
    }

    pub fn initial_fact(mut self, fact: &str) -> Self {
        self.initial_facts.push(fact.to_string());
        self
    }

    pub fn derived_fact(mut self, fact: &str) -> Self {
        self.derived_facts.push(fact.to_string());
        self
    }

    pub fn prints(mut self, line: &str) -> Self {
        self.output.push(line.to_string());
        self
    }
}

/// Fake engine with scripted programs
#[derive(Debug, Clone, Default)]
pub struct FakeRuleEngine {
    programs: HashMap<String, FakeProgram>,
    environments: Arc<AtomicUsize>,
    loads: Arc<Mutex<Vec<String>>>,
}

impl FakeRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behaviour of `source`
    pub fn with_program(mut self, source: &str, program: FakeProgram) -> Self {
        self.programs.insert(source.to_string(), program);
        self
    }

    /// Number of environments handed out
    pub fn environments_created(&self) -> usize {
        self.environments.load(Ordering::SeqCst)
    }

    /// Every source passed to `load`, in order
    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RuleEngine for FakeRuleEngine {
    async fn new_environment(&self) -> Result<Box<dyn Environment>, EngineError> {
        self.environments.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEnvironment {
            programs: self.programs.clone(),
            loads: Arc::clone(&self.loads),
            loaded: Vec::new(),
            facts: Vec::new(),
            ran: 0,
        }))
    }
}

struct FakeEnvironment {
    programs: HashMap<String, FakeProgram>,
    loads: Arc<Mutex<Vec<String>>>,
    loaded: Vec<FakeProgram>,
    facts: Vec<String>,
    ran: u64,
}

#[async_trait]
impl Environment for FakeEnvironment {
    async fn load(&mut self, source: &str) -> Result<(), EngineError> {
        if let Ok(mut loads) = self.loads.lock() {
            loads.push(source.to_string());
        }
        let program = self.programs.get(source).cloned().ok_or_else(|| {
            EngineError::Load("[PRNTUTIL2] Syntax Error: unrecognised program".to_string())
        })?;
        if let Some(message) = &program.load_error {
            return Err(EngineError::Load(message.clone()));
        }
        self.loaded.push(program);
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), EngineError> {
        self.facts = self
            .loaded
            .iter()
            .flat_map(|p| p.initial_facts.iter().cloned())
            .collect();
        self.ran = 0;
        Ok(())
    }

    async fn run(&mut self, limit: Option<u64>) -> Result<RunSummary, EngineError> {
        if let Some(message) = self.loaded.iter().find_map(|p| p.runtime_error.clone()) {
            return Err(EngineError::Runtime(message));
        }

        let wanted = self
            .loaded
            .iter()
            .map(|p| p.firings)
            .sum::<u64>()
            .saturating_sub(self.ran);
        let fired = limit.map_or(wanted, |l| wanted.min(l));
        self.ran += fired;

        let mut output = Vec::new();
        if fired == wanted {
            for program in &self.loaded {
                self.facts.extend(program.derived_facts.iter().cloned());
                output.extend(program.output.iter().cloned());
            }
        }

        Ok(RunSummary {
            rules_fired: fired,
            pending_activations: (wanted - fired) as usize,
            output,
        })
    }

    async fn facts(&mut self) -> Result<Vec<String>, EngineError> {
        Ok(self.facts.clone())
    }
}
