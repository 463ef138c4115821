//! Command-line arguments

use clap::{ArgAction, Parser};
use clipsgen_common::ClipsgenConfig;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "clipsgen")]
#[command(about = "Turn problem descriptions into CLIPS expert systems and run them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: ~/.config/clipsgen/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ollama model used for generation and interpretation
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Ollama server URL
    #[arg(long, value_name = "URL")]
    pub ollama_url: Option<String>,

    /// CLIPS executable
    #[arg(long, value_name = "PATH")]
    pub clips_binary: Option<PathBuf>,

    /// Rule firing ceiling per run (0 = unbounded)
    #[arg(long, value_name = "N")]
    pub max_rule_firings: Option<u64>,

    /// Show generated code and raw output after each result
    #[arg(long)]
    pub details: bool,

    /// Skip the Ollama/model/CLIPS checks at startup
    #[arg(long)]
    pub skip_setup: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Override configuration values with the flags that were given
    pub fn apply(&self, config: &mut ClipsgenConfig) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.model.endpoint = url.trim_end_matches('/').to_string();
        }
        if let Some(binary) = &self.clips_binary {
            config.engine.clips_binary = binary.clone();
        }
        if let Some(limit) = self.max_rule_firings {
            config.engine.max_rule_firings = limit;
        }
        if self.details {
            config.output.show_details = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "clipsgen",
            "--model",
            "llama3",
            "--ollama-url",
            "http://gpu-box:11434/",
            "--clips-binary",
            "/opt/clips/bin/clips",
            "--max-rule-firings",
            "0",
            "--details",
            "-vv",
        ]);
        let mut config = ClipsgenConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.model.name, "llama3");
        assert_eq!(config.model.endpoint, "http://gpu-box:11434");
        assert_eq!(config.engine.clips_binary, PathBuf::from("/opt/clips/bin/clips"));
        assert_eq!(config.engine.firing_limit(), None);
        assert!(config.output.show_details);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["clipsgen"]);
        let mut config = ClipsgenConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, ClipsgenConfig::default());
        assert!(!cli.skip_setup);
    }
}
