//! Session - the interactive generate, execute, interpret loop
//!
//! One turn per input line. Stage failures end the turn, never the session;
//! only an exit command, an interrupt, or end of input stop the loop.

use crate::commands::{is_affirmative, route_command, Command};
use crate::display::Ui;
use crate::interrupt::InterruptFlag;
use crate::progress::ProgressIndicator;
use anyhow::Result;
use clipsgen_common::{
    ClipsgenConfig, ExecutionLimits, ExecutionResult, Executor, GeneratedSource, GenerationConfig,
    GenerationError, Generator, Interpretation, InterpretationConfig, Interpreter, ModelClient,
    ProblemStatement, RuleEngine,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

const TOTAL_STEPS: u8 = 4;

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Generating,
    Executing,
    Interpreting,
    Displaying,
}

impl TurnState {
    /// Progress line for the stages that call out
    pub fn step(self) -> Option<(u8, &'static str)> {
        match self {
            TurnState::Generating => Some((1, "Generating CLIPS code...")),
            TurnState::Executing => Some((2, "Executing CLIPS system...")),
            TurnState::Interpreting => Some((3, "Interpreting results...")),
            TurnState::AwaitingInput | TurnState::Displaying => None,
        }
    }
}

/// How one line of input was handled
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Exit,
    Ignored,
    Help,
    GenerationFailed(GenerationError),
    ExecutionFailed {
        message: String,
        source: GeneratedSource,
    },
    Completed {
        result: ExecutionResult,
        interpretation: Interpretation,
    },
    Interrupted,
}

impl TurnOutcome {
    pub fn ends_session(&self) -> bool {
        matches!(self, TurnOutcome::Exit | TurnOutcome::Interrupted)
    }
}

/// The three pipeline stages
pub struct Stages {
    pub generator: Generator,
    pub executor: Executor,
    pub interpreter: Interpreter,
}

impl Stages {
    pub fn from_config(
        config: &ClipsgenConfig,
        client: Arc<dyn ModelClient>,
        engine: Arc<dyn RuleEngine>,
    ) -> Self {
        Self {
            generator: Generator::new(client.clone(), GenerationConfig::from_config(config)),
            executor: Executor::new(engine, ExecutionLimits::from_settings(&config.engine)),
            interpreter: Interpreter::new(client, InterpretationConfig::from_config(config)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Print generated code and raw output after each result
    pub show_details: bool,
    /// Draw spinners while waiting on the model
    pub spinners: bool,
    /// Ask after each result whether to show the details (interactive runs)
    pub ask_details: bool,
}

pub struct Session<W: Write> {
    stages: Stages,
    ui: Ui<W>,
    options: SessionOptions,
    interrupt: InterruptFlag,
    state: TurnState,
    /// Code and result of the last completed turn, for the details question
    last_turn: Option<(GeneratedSource, ExecutionResult)>,
}

impl<W: Write> Session<W> {
    pub fn new(stages: Stages, ui: Ui<W>, options: SessionOptions, interrupt: InterruptFlag) -> Self {
        Self {
            stages,
            ui,
            options,
            interrupt,
            state: TurnState::AwaitingInput,
            last_turn: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn output(&self) -> &W {
        self.ui.writer()
    }

    pub fn into_output(self) -> W {
        self.ui.into_writer()
    }

    fn enter(&mut self, state: TurnState) {
        debug!("Turn state: {:?} -> {:?}", self.state, state);
        self.state = state;
        if let Some((index, text)) = state.step() {
            self.ui.step(index, TOTAL_STEPS, text);
        }
    }

    /// Handle one line of input
    pub async fn handle_line(&mut self, line: &str) -> TurnOutcome {
        let problem = match route_command(line) {
            Command::Exit => return TurnOutcome::Exit,
            Command::Empty => return TurnOutcome::Ignored,
            Command::Help => {
                self.ui.help();
                return TurnOutcome::Help;
            }
            Command::Problem(text) => ProblemStatement::new(text),
        };

        self.last_turn = None;
        let outcome = self.run_turn(&problem).await;
        self.state = TurnState::AwaitingInput;
        outcome
    }

    async fn run_turn(&mut self, problem: &ProblemStatement) -> TurnOutcome {
        info!("New problem: {} chars", problem.as_str().len());
        self.ui.blank();

        self.enter(TurnState::Generating);
        let mut progress = ProgressIndicator::new("Waiting for the model...", self.options.spinners);
        let generated = self.stages.generator.generate(problem).await;
        progress.finish();
        let source = match generated {
            Ok(source) => source,
            Err(e) => {
                warn!("Generation failed: {}", e);
                self.ui.error(&format!("Code generation failed: {}", e));
                return TurnOutcome::GenerationFailed(e);
            }
        };
        self.ui
            .success(&format!("Code generated ({} lines)", source.line_count()));
        if self.interrupt.is_set() {
            return self.interrupted();
        }

        self.enter(TurnState::Executing);
        let result = self.stages.executor.execute(&source).await;
        if let ExecutionResult::Failure { message } = &result {
            self.ui.error(message);
            self.ui.block("Generated code (for debugging):", source.as_str());
            return TurnOutcome::ExecutionFailed {
                message: message.clone(),
                source,
            };
        }
        self.ui.success("Execution completed");
        if self.interrupt.is_set() {
            return self.interrupted();
        }

        self.enter(TurnState::Interpreting);
        let mut progress = ProgressIndicator::new("Waiting for the model...", self.options.spinners);
        let interpretation = self.stages.interpreter.interpret(problem, &result).await;
        progress.finish();
        if interpretation.degraded {
            self.ui.warning("Interpretation unavailable");
        }
        if self.interrupt.is_set() {
            return self.interrupted();
        }

        self.enter(TurnState::Displaying);
        self.display(&source, &result, &interpretation);

        TurnOutcome::Completed {
            result,
            interpretation,
        }
    }

    fn display(
        &mut self,
        source: &GeneratedSource,
        result: &ExecutionResult,
        interpretation: &Interpretation,
    ) {
        self.ui.section("RESULT");
        self.ui.blank();
        self.ui.line(&interpretation.text);

        if self.options.show_details {
            self.details(source, result);
        } else {
            self.last_turn = Some((source.clone(), result.clone()));
        }
    }

    fn details(&mut self, source: &GeneratedSource, result: &ExecutionResult) {
        self.ui.section("TECHNICAL DETAILS");
        self.ui.block("Generated CLIPS code:", source.as_str());
        self.ui.block("Execution output:", &result.render());
    }

    fn interrupted(&mut self) -> TurnOutcome {
        info!("Turn abandoned after interrupt");
        self.ui.blank();
        self.ui.warning("Interrupted");
        TurnOutcome::Interrupted
    }

    /// Read lines from `input` until exit, interrupt, or end of input
    pub async fn run<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let interrupt = self.interrupt.clone();
        loop {
            self.ui.prompt();

            let line = tokio::select! {
                biased;
                _ = interrupt.wait() => None,
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                self.ui.blank();
                break;
            };

            if self.handle_line(&line).await.ends_session() {
                break;
            }

            if !self.options.ask_details {
                continue;
            }
            let Some((source, result)) = self.last_turn.take() else {
                continue;
            };
            self.ui.blank();
            self.ui.question("Show technical details? (y/n): ");
            let answer = tokio::select! {
                biased;
                _ = interrupt.wait() => None,
                answer = lines.next_line() => answer?,
            };
            match answer {
                Some(answer) if is_affirmative(&answer) => self.details(&source, &result),
                Some(_) => {}
                None => {
                    self.ui.blank();
                    break;
                }
            }
        }

        self.ui.blank();
        self.ui.line("Goodbye!");
        Ok(())
    }
}
