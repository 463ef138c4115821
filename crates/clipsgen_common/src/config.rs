//! Clipsgen Configuration
//!
//! User configuration for the model endpoint, prompt templates, rule engine
//! limits and output preferences.
//! Config file: $XDG_CONFIG_HOME/clipsgen/config.toml (usually ~/.config/clipsgen/)

use crate::prompts;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Ollama API endpoint
pub const OLLAMA_DEFAULT_URL: &str = "http://127.0.0.1:11434";

/// Default model used for both code generation and interpretation
pub const DEFAULT_MODEL: &str = "codellama";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("prompt template '{template}' is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        template: &'static str,
        placeholder: &'static str,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("model name must not be empty")]
    EmptyModel,
}

/// Model client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Ollama base URL
    pub endpoint: String,

    /// Model used for generation and interpretation
    pub name: String,

    /// Per-request timeout. Code generation on CPU-only machines is slow.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: OLLAMA_DEFAULT_URL.to_string(),
            name: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Prompt templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Must contain `{problem}`
    pub generation: String,

    /// Must contain `{problem}` and `{output}`
    pub interpretation: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            generation: prompts::GENERATION_TEMPLATE.to_string(),
            interpretation: prompts::INTERPRETATION_TEMPLATE.to_string(),
        }
    }
}

/// Rule engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Path or name of the CLIPS command-line interpreter
    pub clips_binary: PathBuf,

    /// Wall-clock limit for one engine process
    pub timeout_secs: u64,

    /// Maximum rule firings per run (0 = unbounded)
    pub max_rule_firings: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            clips_binary: PathBuf::from("clips"),
            timeout_secs: 30,
            max_rule_firings: 10_000,
        }
    }
}

impl EngineSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Firing ceiling, `None` when disabled
    pub fn firing_limit(&self) -> Option<u64> {
        match self.max_rule_firings {
            0 => None,
            n => Some(n),
        }
    }
}

/// Color display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color only when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputSettings {
    pub color: ColorMode,

    /// Print generated code and raw execution output after each result
    pub show_details: bool,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClipsgenConfig {
    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub prompts: PromptSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

impl ClipsgenConfig {
    /// Default user config path: ~/.config/clipsgen/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clipsgen").join("config.toml"))
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/clipsgen/config.toml)
    /// 3. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ClipsgenConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("model.timeout_secs"));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("engine.timeout_secs"));
        }
        if !self.prompts.generation.contains(prompts::PROBLEM_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder {
                template: "generation",
                placeholder: prompts::PROBLEM_PLACEHOLDER,
            });
        }
        for placeholder in [prompts::PROBLEM_PLACEHOLDER, prompts::OUTPUT_PLACEHOLDER] {
            if !self.prompts.interpretation.contains(placeholder) {
                return Err(ConfigError::MissingPlaceholder {
                    template: "interpretation",
                    placeholder,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = ClipsgenConfig::default();
        assert_eq!(config.model.endpoint, "http://127.0.0.1:11434");
        assert_eq!(config.model.name, "codellama");
        assert_eq!(config.engine.firing_limit(), Some(10_000));
        assert_eq!(config.output.color, ColorMode::Auto);
        assert!(!config.output.show_details);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[model]\nname = \"llama3.2\"\n\n[engine]\nmax_rule_firings = 0\n\n[output]\ncolor = \"never\""
        )
        .unwrap();

        let config = ClipsgenConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.model.name, "llama3.2");
        assert_eq!(config.model.endpoint, OLLAMA_DEFAULT_URL);
        assert_eq!(config.engine.firing_limit(), None);
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.output.color, ColorMode::Never);
        assert_eq!(config.prompts, PromptSettings::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = ClipsgenConfig::load(Some(Path::new("/nonexistent/clipsgen.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let mut config = ClipsgenConfig::default();
        config.prompts.interpretation = "Explain {problem} please".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingPlaceholder {
                template: "interpretation",
                placeholder: "{output}",
            })
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ClipsgenConfig::default();
        config.engine.timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("engine.timeout_secs"))
        );
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let original = ClipsgenConfig::default();
        let text = toml::to_string(&original).unwrap();
        let parsed: ClipsgenConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }
}
