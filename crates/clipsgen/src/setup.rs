//! Startup checks - Ollama reachable, model installed, CLIPS runnable
//!
//! Each check prints what it found and, on failure, how to fix it. The
//! caller turns an `Err` into exit status 1.

use crate::commands::is_affirmative;
use crate::display::Ui;
use crate::progress::ProgressIndicator;
use anyhow::{bail, Context, Result};
use clipsgen_common::model_client::model_matches;
use clipsgen_common::{ClipsProcessEngine, EngineError, ModelClient};
use std::io::{BufRead, Write};
use tracing::info;

/// Confirmation source for the model download question
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Reads a y/n answer from stdin
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{} (y/n): ", question);
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_affirmative(&answer)
    }
}

/// Fixed answer, for scripted runs and tests
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _question: &str) -> bool {
        self.0
    }
}

/// List installed models, or explain how to start Ollama
pub async fn check_ollama<W: Write>(
    client: &dyn ModelClient,
    endpoint: &str,
    ui: &mut Ui<W>,
) -> Result<Vec<String>> {
    ui.line("Checking Ollama...");
    match client.list_models().await {
        Ok(models) => {
            ui.success(&format!("Ollama is running at {}", endpoint));
            Ok(models)
        }
        Err(e) => {
            ui.error(&format!("Ollama is not reachable at {}", endpoint));
            ui.blank();
            ui.line("Start it in another terminal:");
            ui.line("  ollama serve");
            ui.blank();
            ui.line("Install it from https://ollama.com if it is missing.");
            Err(e).context("Ollama is not running")
        }
    }
}

/// Make sure `model` is installed, offering to download it
pub async fn ensure_model<W: Write>(
    client: &dyn ModelClient,
    model: &str,
    installed: &[String],
    ui: &mut Ui<W>,
    confirm: &mut dyn Confirm,
    spinners: bool,
) -> Result<()> {
    if installed.iter().any(|name| model_matches(name, model)) {
        ui.success(&format!("Model {} is installed", model));
        return Ok(());
    }

    ui.warning(&format!("Model {} is not installed", model));
    if !confirm.confirm(&format!("Download {}?", model)) {
        ui.line(&format!("Download it manually with: ollama pull {}", model));
        bail!("model {} is not installed", model);
    }

    info!("Pulling model {}", model);
    let mut progress =
        ProgressIndicator::new(&format!("Downloading {} (this may take a while)...", model), spinners);
    let pulled = client.pull_model(model).await;
    let elapsed = progress.finish();

    match pulled {
        Ok(()) => {
            ui.success(&format!("Model {} downloaded ({:.1}s)", model, elapsed));
            Ok(())
        }
        Err(e) => {
            ui.error(&format!("Download failed: {}", e));
            Err(e).with_context(|| format!("could not download model {}", model))
        }
    }
}

/// Run the CLIPS binary once, or explain how to install it
pub async fn check_engine<W: Write>(engine: &ClipsProcessEngine, ui: &mut Ui<W>) -> Result<()> {
    ui.line("Checking CLIPS...");
    match engine.probe().await {
        Ok(()) => {
            ui.success(&format!("CLIPS is available ({})", engine.binary().display()));
            Ok(())
        }
        Err(e) => {
            ui.error(&format!("CLIPS could not be started: {}", e));
            ui.blank();
            if matches!(e, EngineError::Unavailable(_)) {
                ui.line("Install the CLIPS command-line interpreter, for example:");
                ui.line("  sudo apt install clips");
                ui.line("or point --clips-binary / [engine] clips_binary at it.");
            }
            Err(e).context("CLIPS is not available")
        }
    }
}

/// All startup checks in order
pub async fn run<W: Write>(
    client: &dyn ModelClient,
    endpoint: &str,
    model: &str,
    engine: &ClipsProcessEngine,
    ui: &mut Ui<W>,
    confirm: &mut dyn Confirm,
    spinners: bool,
) -> Result<()> {
    let installed = check_ollama(client, endpoint, ui).await?;
    ensure_model(client, model, &installed, ui, confirm, spinners).await?;
    check_engine(engine, ui).await?;
    Ok(())
}
