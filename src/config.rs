//! Configuration management
//!
//! Manages store location, reflection log bounds, search thresholds and
//! reasoning budget defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::reasoning::DEFAULT_MAX_REFLECTIONS;

/// Environment variable that overrides the store root
pub const HOME_ENV: &str = "SYSTEMATIC_REASONING_HOME";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where namespaces are stored and how much history they keep
    #[serde(default)]
    pub store: StoreConfig,
    /// Fuzzy search thresholds and limits
    #[serde(default)]
    pub search: SearchConfig,
    /// Reasoning budget defaults
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store root override (defaults to `<data dir>/namespaces`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Reflections kept per workspace
    #[serde(default = "default_max_reflections")]
    pub max_reflections: usize,
}

fn default_max_reflections() -> usize {
    DEFAULT_MAX_REFLECTIONS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_reflections: default_max_reflections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Cutoff for workspace searches (OR across terms, so more lenient)
    #[serde(default = "default_local_threshold")]
    pub local_threshold: f64,
    /// Cutoff for cross-workspace searches
    #[serde(default = "default_global_threshold")]
    pub global_threshold: f64,
    /// Results returned when the caller gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_local_threshold() -> f64 {
    0.6
}

fn default_global_threshold() -> f64 {
    0.4
}

fn default_limit() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            local_threshold: default_local_threshold(),
            global_threshold: default_global_threshold(),
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Token budget used when the caller does not give one
    #[serde(default = "default_token_budget")]
    pub default_token_budget: u32,
    /// Largest token budget a caller may request
    #[serde(default = "default_max_token_budget")]
    pub max_token_budget: u32,
}

fn default_token_budget() -> u32 {
    2000
}

fn default_max_token_budget() -> u32 {
    8000
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            default_token_budget: default_token_budget(),
            max_token_budget: default_max_token_budget(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding one subdirectory per workspace namespace
    ///
    /// `store.root` when set (the CLI fills it from `--store` or
    /// `SYSTEMATIC_REASONING_HOME`), otherwise the platform data directory.
    pub fn store_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.store.root {
            return Ok(root.clone());
        }
        Ok(data_dir()?.join("namespaces"))
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "systematic-reasoning", "systematic-reasoning")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "systematic-reasoning", "systematic-reasoning")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show the effective configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("Configuration ({})", config_path()?.display());
    println!("  store root:          {}", config.store_root()?.display());
    println!("  max reflections:     {}", config.store.max_reflections);
    println!("  local threshold:     {}", config.search.local_threshold);
    println!("  global threshold:    {}", config.search.global_threshold);
    println!("  default limit:       {}", config.search.default_limit);
    println!("  default budget:      {} tokens", config.reasoning.default_token_budget);
    println!("  max budget:          {} tokens", config.reasoning.max_token_budget);

    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
