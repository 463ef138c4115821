//! clipsgen - describe a problem, get a running CLIPS expert system

use anyhow::Result;
use clap::Parser;
use clipsgen::cli::Cli;
use clipsgen::display::{use_color, Ui};
use clipsgen::interrupt::{listen_for_ctrl_c, InterruptFlag};
use clipsgen::setup::{self, StdinConfirm};
use clipsgen::{logging, Session, SessionOptions, Stages};
use clipsgen_common::{ClipsProcessEngine, ClipsgenConfig, OllamaClient};
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = ClipsgenConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    info!("clipsgen v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Model {} at {}, CLIPS binary {}",
        config.model.name,
        config.model.endpoint,
        config.engine.clips_binary.display()
    );

    let color = use_color(config.output.color);
    let spinners = console::Term::stderr().is_term();
    let mut ui = Ui::new(std::io::stdout(), color);

    let client = Arc::new(OllamaClient::from_settings(&config.model));
    let engine = Arc::new(ClipsProcessEngine::from_settings(&config.engine));

    if !cli.skip_setup {
        let checked = setup::run(
            client.as_ref(),
            &config.model.endpoint,
            &config.model.name,
            engine.as_ref(),
            &mut ui,
            &mut StdinConfirm,
            spinners,
        )
        .await;
        if let Err(e) = checked {
            ui.blank();
            ui.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }

    ui.welcome();

    let interrupt = InterruptFlag::new();
    listen_for_ctrl_c(interrupt.clone());

    let stages = Stages::from_config(&config, client, engine);
    let options = SessionOptions {
        show_details: config.output.show_details,
        spinners,
        ask_details: !config.output.show_details && std::io::stdin().is_terminal(),
    };
    let mut session = Session::new(stages, ui, options, interrupt);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session.run(stdin).await
}
