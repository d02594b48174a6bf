//! Configuration for clm.
//!
//! Loaded from YAML with a fallback chain, then overridden by environment
//! variables and finally by CLI flags:
//! 1. Explicit path if provided (`-c`)
//! 2. clm.yml in the current directory
//! 3. ~/.config/clm/clm.yml
//! 4. Defaults

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default model id, served by a local Ollama
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Default tool script directory, relative to the current directory
pub const DEFAULT_TOOLS_DIR: &str = "tools";

/// Environment variable overriding `ll-model`
pub const ENV_MODEL: &str = "CLM_LL_MODEL";

/// Environment variable overriding `tools-dirs` (colon separated)
pub const ENV_TOOLS_DIR: &str = "CLM_TOOLS_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model id used for every tool run
    #[serde(rename = "ll-model")]
    pub ll_model: String,

    /// Directories searched for tool scripts
    #[serde(rename = "tools-dirs")]
    pub tools_dirs: Vec<PathBuf>,

    /// Which directory wins when two contain a tool with the same name
    #[serde(rename = "dir-precedence")]
    pub dir_precedence: DirPrecedence,

    /// Model backend settings
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ll_model: DEFAULT_MODEL.to_string(),
            tools_dirs: vec![PathBuf::from(DEFAULT_TOOLS_DIR)],
            dir_precedence: DirPrecedence::default(),
            llm: LlmConfig::default(),
        }
    }
}

/// Merge order for multiple tool directories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirPrecedence {
    /// A directory listed later replaces same-named tools from earlier ones
    #[default]
    LastWins,
    /// The first directory providing a name keeps it
    FirstWins,
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Maximum tokens requested from providers that need it
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Ollama server
    pub ollama: ProviderConfig,

    /// Anthropic API
    pub anthropic: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 300_000,
            max_tokens: 8192,
            ollama: ProviderConfig {
                base_url: "http://localhost:11434".to_string(),
                api_key_env: None,
            },
            anthropic: ProviderConfig {
                base_url: "https://api.anthropic.com".to_string(),
                api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
            },
        }
    }
}

/// Provider endpoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try project config
        let project_config = PathBuf::from(format!("{}.yml", project_name));
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", project_config.display(), e);
                }
            }
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `CLM_LL_MODEL` and `CLM_TOOLS_DIR` from the environment
    pub fn with_env(self) -> Self {
        let model = std::env::var(ENV_MODEL).ok();
        let tools_dirs = std::env::var(ENV_TOOLS_DIR).ok();
        self.with_env_values(model.as_deref(), tools_dirs.as_deref())
    }

    fn with_env_values(mut self, model: Option<&str>, tools_dirs: Option<&str>) -> Self {
        if let Some(model) = model.filter(|m| !m.is_empty()) {
            log::debug!("Model overridden by {}: {}", ENV_MODEL, model);
            self.ll_model = model.to_string();
        }
        if let Some(dirs) = tools_dirs.filter(|d| !d.is_empty()) {
            log::debug!("Tool directories overridden by {}: {}", ENV_TOOLS_DIR, dirs);
            self.tools_dirs = std::env::split_paths(dirs).collect();
        }
        self
    }

    /// Apply CLI flags, which beat both files and environment
    pub fn with_cli(mut self, ll_model: Option<&str>, tools_dirs: &[PathBuf]) -> Self {
        if let Some(model) = ll_model {
            self.ll_model = model.to_string();
        }
        if !tools_dirs.is_empty() {
            self.tools_dirs = tools_dirs.to_vec();
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ll_model.trim().is_empty() {
            eyre::bail!("ll-model must not be empty");
        }
        if self.tools_dirs.is_empty() {
            eyre::bail!("tools-dirs must name at least one directory");
        }
        Ok(())
    }
}
