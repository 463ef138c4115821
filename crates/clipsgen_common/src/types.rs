//! Per-turn pipeline data
//!
//! Every value here is created within one turn and dropped at its end.

use std::fmt;

/// Free-text problem description typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemStatement(String);

impl ProblemStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProblemStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitized model output claimed to be CLIPS source
///
/// Validity is only discovered when the execution stage loads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource(String);

impl GeneratedSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

impl fmt::Display for GeneratedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of executing a program. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success {
        rules_fired: u64,
        facts: Vec<String>,
        /// Lines printed by the program's output statements
        output: Vec<String>,
    },
    Failure {
        message: String,
    },
}

impl ExecutionResult {
    pub fn failure(message: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Text used in the interpretation prompt and the details view
    pub fn render(&self) -> String {
        match self {
            ExecutionResult::Failure { message } => message.clone(),
            ExecutionResult::Success {
                rules_fired,
                facts,
                output,
            } => {
                let mut text = if facts.is_empty() {
                    format!("Rules fired: {}\nNo facts generated.", rules_fired)
                } else {
                    let listed: Vec<String> = facts.iter().map(|f| format!("  {}", f)).collect();
                    format!("Rules fired: {}\n\nFacts:\n{}", rules_fired, listed.join("\n"))
                };
                if !output.is_empty() {
                    text.push_str("\n\nProgram output:\n");
                    let printed: Vec<String> = output.iter().map(|l| format!("  {}", l)).collect();
                    text.push_str(&printed.join("\n"));
                }
                text
            }
        }
    }
}

/// Plain-language explanation shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub text: String,
    /// True when the model failed and a local placeholder was used
    pub degraded: bool,
}
