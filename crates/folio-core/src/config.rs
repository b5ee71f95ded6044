//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/folio/config.toml)
//! 3. Environment variables (FOLIO_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! Each optional section (`[github]`, `[gist]`, `[jsonbin]`, `[pages]`,
//! `[functions]`) registers one remote backend when present.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::ContentStore;

/// Environment variable prefix
const ENV_PREFIX: &str = "FOLIO";

/// Default per-attempt time limit in seconds
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the local cache
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upper bound on any single backend attempt
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Backend names in the order they are consulted on load.
    /// Empty means registration order.
    #[serde(default)]
    pub read_order: Vec<String>,

    /// Backend names in the order they are written on save.
    /// Empty means registration order.
    #[serde(default)]
    pub write_order: Vec<String>,

    /// Names of in-memory stand-in backends (e.g. "firebase", "supabase")
    #[serde(default)]
    pub simulated: Vec<String>,

    /// Log file (CLI logs to stderr when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gist: Option<GistConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonbin: Option<JsonBinConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<PagesConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<FunctionsConfig>,
}

/// GitHub contents API backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubConfig {
    /// Repository as `owner/name`
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_github_api")]
    pub api_url: String,
    /// Access token. Usually left out and stored in the cache instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Private gist holding one `<type>.json` file per document
///
/// Authenticates with the GitHub token; the gist itself is created on first
/// use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GistConfig {
    #[serde(default = "default_github_api")]
    pub api_url: String,
    #[serde(default = "default_gist_description")]
    pub description: String,
}

/// JSON-bin document store backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonBinConfig {
    #[serde(default = "default_jsonbin_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,
}

/// Published site the content files are served from (read-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagesConfig {
    pub site_url: String,
}

/// Serverless functions exposing save-data/load-data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionsConfig {
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            read_order: Vec::new(),
            write_order: Vec::new(),
            simulated: Vec::new(),
            log_file: None,
            github: None,
            gist: None,
            jsonbin: None,
            pages: None,
            functions: None,
        }
    }
}

impl GitHubConfig {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: default_branch(),
            api_url: default_github_api(),
            token: None,
        }
    }
}

impl Default for GistConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api(),
            description: default_gist_description(),
        }
    }
}

impl Default for JsonBinConfig {
    fn default() -> Self {
        Self {
            endpoint: default_jsonbin_endpoint(),
            master_key: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FOLIO_DATA_DIR, FOLIO_GITHUB_TOKEN, ...)
    /// 2. Config file (~/.config/folio/config.toml or FOLIO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = Self::load_file_only(path)?;
        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load exactly what the file says (or defaults), without env overrides
    ///
    /// Use this when the result is written back, so credentials and paths
    /// from the environment never end up in the file.
    pub fn load_file_only(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_ATTEMPT_TIMEOUT", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse::<u64>() {
                self.attempt_timeout_secs = secs;
            }
        }

        // FOLIO_GITHUB_REPO creates the section; FOLIO_GITHUB_TOKEN only fills it in
        if let Ok(val) = std::env::var(format!("{}_GITHUB_REPO", ENV_PREFIX)) {
            if !val.is_empty() {
                match self.github.as_mut() {
                    Some(github) => github.repo = val,
                    None => self.github = Some(GitHubConfig::new(val)),
                }
            }
        }

        if let Ok(val) = std::env::var(format!("{}_GITHUB_TOKEN", ENV_PREFIX)) {
            if let Some(github) = self.github.as_mut() {
                github.token = if val.is_empty() { None } else { Some(val) };
            }
        }

        if let Ok(val) = std::env::var(format!("{}_JSONBIN_MASTER_KEY", ENV_PREFIX)) {
            if !val.is_empty() {
                self.jsonbin
                    .get_or_insert_with(JsonBinConfig::default)
                    .master_key = Some(val);
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FOLIO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }

    /// Directory holding the local cache entries
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Per-attempt time limit
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs.max(1))
    }

    /// Assemble the content store this configuration describes
    pub fn build_store(&self) -> Result<ContentStore> {
        ContentStore::from_config(self)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
}

fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_SECS
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_gist_description() -> String {
    "Portfolio content".to_string()
}

fn default_jsonbin_endpoint() -> String {
    "https://api.jsonbin.io/v3/b".to_string()
}
