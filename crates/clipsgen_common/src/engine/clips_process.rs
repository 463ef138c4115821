//! CLIPS child-process engine
//!
//! Every operation runs a fresh `clips -f2 <script>` process against the
//! program file kept in the environment's private temp directory. Nothing
//! survives between processes, so environments cannot see each other.
//!
//! Script output is split into sections by sentinel lines printed with
//! `printout`, then parsed:
//! - load:   `(load*)` diagnostics followed by its TRUE/FALSE result
//! - run:    program printouts plus `FIRE` lines from `(watch rules)`
//! - agenda: `(agenda)` listing
//! - facts:  `(facts)` listing

use super::{EngineError, Environment, RuleEngine, RunSummary};
use crate::config::EngineSettings;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

const LOAD_MARKER: &str = "<<<clipsgen:load>>>";
const LOADED_MARKER: &str = "<<<clipsgen:loaded>>>";
const RUN_MARKER: &str = "<<<clipsgen:run>>>";
const AGENDA_MARKER: &str = "<<<clipsgen:agenda>>>";
const FACTS_MARKER: &str = "<<<clipsgen:facts>>>";
const END_MARKER: &str = "<<<clipsgen:end>>>";

const PROGRAM_FILE: &str = "program.clp";
const SCRIPT_FILE: &str = "session.bat";

/// CLIPS interactive prompt, present if the binary echoes despite -f2
const PROMPT: &str = "CLIPS> ";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    // Constant patterns, each exercised by the parser tests
    cell.get_or_init(|| Regex::new(pattern).expect("constant regex"))
}

fn fire_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"FIRE\s+\d+\s+\S+:")
}

fn error_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^\[[A-Z]+\d+\]")
}

fn fact_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^f-\d+\s+(.*)$")
}

/// Quote a path for use inside a CLIPS string literal
fn clips_string(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Remove echoed prompts
fn strip_prompt(line: &str) -> &str {
    let mut line = line;
    while let Some(rest) = line.strip_prefix(PROMPT) {
        line = rest;
    }
    line
}

/// Per-construct progress glyphs printed by `(load)`
fn is_load_noise(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.chars().all(|c| "*%$!:#&~^+=".contains(c))
}

/// Parsed result of the `(load*)` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTranscript {
    pub loaded: bool,
    pub diagnostics: Vec<String>,
}

/// Parse the output of a load-only script.
///
/// CLIPS prints the opening marker, then whatever the loader reports, then
/// the TRUE/FALSE verdict, then the closing marker. The verdict is the last
/// token before the closing marker; everything else in between is a
/// diagnostic.
pub fn parse_load_transcript(stdout: &str) -> Result<LoadTranscript, EngineError> {
    let mut lines = stdout.lines().map(strip_prompt);
    if !lines.any(|line| line.trim() == LOAD_MARKER) {
        return Err(EngineError::Runtime(
            "rule engine exited before loading the program".to_string(),
        ));
    }

    let mut between = Vec::new();
    let mut closed = false;
    for line in lines {
        if line.trim() == LOADED_MARKER {
            closed = true;
            break;
        }
        if !line.trim().is_empty() {
            between.push(line.trim_end().to_string());
        }
    }
    if !closed {
        return Err(EngineError::Runtime(
            "rule engine exited before reporting the load result".to_string(),
        ));
    }

    let last = between.pop().unwrap_or_default();
    let (rest, loaded) = if let Some(rest) = last.strip_suffix("TRUE") {
        (rest, true)
    } else if let Some(rest) = last.strip_suffix("FALSE") {
        (rest, false)
    } else {
        return Err(EngineError::Runtime(format!(
            "unexpected load result: {}",
            last.trim()
        )));
    };
    if !rest.trim().is_empty() && !is_load_noise(rest) {
        between.push(rest.trim_end().to_string());
    }

    let diagnostics = between
        .into_iter()
        .filter(|line| !is_load_noise(line))
        .map(|line| line.trim().to_string())
        .collect();
    Ok(LoadTranscript {
        loaded,
        diagnostics,
    })
}

/// Parsed result of a full run script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTranscript {
    pub rules_fired: u64,
    pub output: Vec<String>,
    pub errors: Vec<String>,
    pub pending_activations: usize,
    pub facts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Run,
    Agenda,
    Facts,
    Done,
}

/// Parse the output of a run script
pub fn parse_run_transcript(stdout: &str) -> Result<RunTranscript, EngineError> {
    let mut transcript = RunTranscript::default();
    let mut section = Section::Preamble;

    for raw in stdout.lines() {
        let line = strip_prompt(raw);
        let trimmed = line.trim();

        let next = match trimmed {
            RUN_MARKER => Some(Section::Run),
            AGENDA_MARKER => Some(Section::Agenda),
            FACTS_MARKER => Some(Section::Facts),
            END_MARKER => Some(Section::Done),
            _ => None,
        };
        if let Some(next) = next {
            section = next;
            continue;
        }

        match section {
            Section::Preamble | Section::Done => {}
            Section::Run => {
                let fires: Vec<_> = fire_regex().find_iter(line).collect();
                transcript.rules_fired += fires.len() as u64;
                let printed = match fires.first() {
                    Some(m) => &line[..m.start()],
                    None => line,
                };
                if error_code_regex().is_match(printed.trim_start()) {
                    transcript.errors.push(printed.trim().to_string());
                } else if !printed.trim().is_empty() {
                    transcript.output.push(printed.trim_end().to_string());
                }
            }
            Section::Agenda => {
                if !trimmed.is_empty() && !trimmed.starts_with("For a total of") {
                    transcript.pending_activations += 1;
                }
            }
            Section::Facts => {
                if let Some(caps) = fact_line_regex().captures(trimmed) {
                    transcript.facts.push(caps[1].trim().to_string());
                }
            }
        }
    }

    if section != Section::Done {
        return Err(EngineError::Runtime(
            "rule engine exited before finishing (a rule may have called exit)".to_string(),
        ));
    }
    Ok(transcript)
}

/// Engine backed by the CLIPS command-line interpreter
#[derive(Debug, Clone)]
pub struct ClipsProcessEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl ClipsProcessEngine {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.clips_binary.clone(), settings.timeout())
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check that the binary starts and exits on command
    pub async fn probe(&self) -> Result<(), EngineError> {
        let dir = TempDir::new()?;
        let script = dir.path().join(SCRIPT_FILE);
        tokio::fs::write(&script, "(exit)\n").await?;
        run_script(&self.binary, &script, self.timeout).await.map(|_| ())
    }
}

#[async_trait]
impl RuleEngine for ClipsProcessEngine {
    async fn new_environment(&self) -> Result<Box<dyn Environment>, EngineError> {
        let dir = TempDir::new()?;
        debug!("New CLIPS environment in {}", dir.path().display());
        Ok(Box::new(ClipsEnvironment {
            binary: self.binary.clone(),
            timeout: self.timeout,
            dir,
            loaded: false,
            reset_requested: false,
            last_facts: None,
        }))
    }
}

/// One isolated environment: a private directory plus the pending commands
struct ClipsEnvironment {
    binary: PathBuf,
    timeout: Duration,
    dir: TempDir,
    loaded: bool,
    reset_requested: bool,
    last_facts: Option<Vec<String>>,
}

impl ClipsEnvironment {
    fn program_path(&self) -> PathBuf {
        self.dir.path().join(PROGRAM_FILE)
    }

    async fn run_lines(&self, lines: &[String]) -> Result<ScriptOutput, EngineError> {
        let script = self.dir.path().join(SCRIPT_FILE);
        let mut body = lines.join("\n");
        body.push('\n');
        tokio::fs::write(&script, body).await?;
        run_script(&self.binary, &script, self.timeout).await
    }

    fn prelude(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.loaded {
            lines.push(format!("(load* {})", clips_string(&self.program_path())));
        }
        lines
    }

    async fn execute(&mut self, run: Option<Option<u64>>) -> Result<RunTranscript, EngineError> {
        let mut lines = self.prelude();
        lines.push(format!("(printout t crlf \"{}\" crlf)", RUN_MARKER));
        if self.reset_requested {
            lines.push("(reset)".to_string());
        }
        if let Some(limit) = run {
            lines.push("(watch rules)".to_string());
            lines.push(match limit {
                Some(n) => format!("(run {})", n),
                None => "(run)".to_string(),
            });
            lines.push("(unwatch rules)".to_string());
        }
        lines.push(format!("(printout t crlf \"{}\" crlf)", AGENDA_MARKER));
        lines.push("(agenda)".to_string());
        lines.push(format!("(printout t crlf \"{}\" crlf)", FACTS_MARKER));
        lines.push("(facts)".to_string());
        lines.push(format!("(printout t crlf \"{}\" crlf)", END_MARKER));
        lines.push("(exit)".to_string());

        let output = self.run_lines(&lines).await?;
        let transcript = parse_run_transcript(&output.stdout)?;
        if !transcript.errors.is_empty() {
            return Err(EngineError::Runtime(transcript.errors.join("\n")));
        }
        Ok(transcript)
    }
}

#[async_trait]
impl Environment for ClipsEnvironment {
    async fn load(&mut self, source: &str) -> Result<(), EngineError> {
        let program = self.program_path();
        tokio::fs::write(&program, source).await?;

        let lines = vec![
            format!("(printout t crlf \"{}\" crlf)", LOAD_MARKER),
            format!("(printout t (load* {}) crlf)", clips_string(&program)),
            format!("(printout t crlf \"{}\" crlf)", LOADED_MARKER),
            "(exit)".to_string(),
        ];
        let output = self.run_lines(&lines).await?;
        let mut transcript = parse_load_transcript(&output.stdout)?;
        if !transcript.loaded && transcript.diagnostics.is_empty() {
            transcript.diagnostics = output.stderr_lines();
        }

        if !transcript.loaded {
            let details = if transcript.diagnostics.is_empty() {
                "the program could not be loaded".to_string()
            } else {
                transcript.diagnostics.join("\n")
            };
            return Err(EngineError::Load(details));
        }
        if !transcript.diagnostics.is_empty() {
            warn!("CLIPS load reported: {}", transcript.diagnostics.join(" | "));
        }
        self.loaded = true;
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), EngineError> {
        self.reset_requested = true;
        self.last_facts = None;
        Ok(())
    }

    async fn run(&mut self, limit: Option<u64>) -> Result<RunSummary, EngineError> {
        let transcript = self.execute(Some(limit)).await?;
        self.last_facts = Some(transcript.facts);
        Ok(RunSummary {
            rules_fired: transcript.rules_fired,
            pending_activations: transcript.pending_activations,
            output: transcript.output,
        })
    }

    async fn facts(&mut self) -> Result<Vec<String>, EngineError> {
        if let Some(facts) = &self.last_facts {
            return Ok(facts.clone());
        }
        let transcript = self.execute(None).await?;
        Ok(transcript.facts)
    }
}

/// Captured output of one script run
#[derive(Debug, Clone, Default)]
struct ScriptOutput {
    stdout: String,
    stderr: String,
}

impl ScriptOutput {
    fn stderr_lines(&self) -> Vec<String> {
        self.stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Run `clips -f2 <script>` with a wall-clock bound
async fn run_script(
    binary: &Path,
    script: &Path,
    timeout: Duration,
) -> Result<ScriptOutput, EngineError> {
    let child = Command::new(binary)
        .arg("-f2")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                EngineError::Unavailable(format!("{} not found", binary.display()))
            }
            _ => EngineError::Io(e.to_string()),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("CLIPS process exceeded {:?}, killed", timeout);
            return Err(EngineError::Timeout(timeout.as_secs()));
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !stderr.trim().is_empty() {
        debug!("CLIPS stderr: {}", stderr.trim());
    }
    Ok(ScriptOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr,
    })
}
