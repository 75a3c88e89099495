//! Configuration system for Stellari
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (STELLARI_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::generator::{AnthropicConfig, GeneratorConfig};
use crate::store::RestStoreConfig;

const REDACTED: &str = "<redacted>";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StellariConfig {
    /// Text-generation service settings
    pub llm: LlmSettings,

    /// Hosted database settings
    pub store: StoreSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Text-generation (Messages API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// API key; empty selects the offline instruction template
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Value of the `anthropic-version` header
    pub api_version: String,

    /// Token budget for instruction generation
    pub instructions_max_tokens: u32,

    /// Token budget for follow-up question generation
    pub questions_max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Hosted database (PostgREST) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Project URL, e.g. "https://xyz.supabase.co" (empty = no store)
    pub url: String,

    /// Public anonymous key sent as `apikey`
    pub anon_key: String,

    /// Signed-in user token; falls back to the anonymous key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_version: "2023-06-01".to_string(),
            instructions_max_tokens: 2000,
            questions_max_tokens: 1000,
            timeout_secs: 120,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl StellariConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| {
                Error::config_parse(format!("{}: {}", path.display(), e.message()), e)
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::config_not_found(path))
            };
        }

        let search_paths = [
            Some(PathBuf::from("stellari.toml")),
            dirs::config_dir().map(|p| p.join("stellari").join("config.toml")),
            dirs::home_dir().map(|p| p.join(".stellari").join("config.toml")),
        ];

        for path in search_paths.into_iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STELLARI_LLM_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("STELLARI_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("STELLARI_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("STELLARI_LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.llm.timeout_secs = n;
            }
        }

        if let Ok(val) = std::env::var("STELLARI_STORE_URL") {
            self.store.url = val;
        }
        if let Ok(val) = std::env::var("STELLARI_STORE_ANON_KEY") {
            self.store.anon_key = val;
        }
        if let Ok(val) = std::env::var("STELLARI_STORE_ACCESS_TOKEN") {
            self.store.access_token = Some(val);
        }
        if let Ok(val) = std::env::var("STELLARI_STORE_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.store.timeout_secs = n;
            }
        }

        if let Ok(val) = std::env::var("STELLARI_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("STELLARI_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("STELLARI_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.llm.base_url.is_empty() || !is_http_url(&self.llm.base_url) {
            return Err(Error::config_field_invalid(
                "llm.base_url",
                "llm.base_url must start with http:// or https://",
            ));
        }
        if self.llm.model.is_empty() {
            return Err(Error::config_field_invalid("llm.model", "llm.model cannot be empty"));
        }
        if self.llm.instructions_max_tokens == 0 || self.llm.questions_max_tokens == 0 {
            return Err(Error::config_validation("LLM token budgets must be greater than 0"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "llm.timeout_secs",
                "llm.timeout_secs must be greater than 0",
            ));
        }
        if self.store.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "store.timeout_secs",
                "store.timeout_secs must be greater than 0",
            ));
        }

        if !self.store.url.is_empty() {
            if !is_http_url(&self.store.url) {
                return Err(Error::config_field_invalid(
                    "store.url",
                    "store.url must start with http:// or https://",
                ));
            }
            if self.store.anon_key.is_empty() {
                return Err(Error::config_field_invalid(
                    "store.anon_key",
                    "store.anon_key is required when store.url is set",
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Generator selection: an empty API key means the offline template
    pub fn generator_config(&self) -> GeneratorConfig {
        if self.llm.api_key.trim().is_empty() {
            return GeneratorConfig::Unconfigured;
        }
        GeneratorConfig::Anthropic(AnthropicConfig {
            api_key: self.llm.api_key.clone(),
            base_url: self.llm.base_url.trim_end_matches('/').to_string(),
            model: self.llm.model.clone(),
            api_version: self.llm.api_version.clone(),
            instructions_max_tokens: self.llm.instructions_max_tokens,
            questions_max_tokens: self.llm.questions_max_tokens,
            timeout_secs: self.llm.timeout_secs,
        })
    }

    /// REST store settings, or `StoreNotConfigured` when no URL is set
    pub fn rest_store_config(&self) -> Result<RestStoreConfig> {
        if self.store.url.trim().is_empty() {
            return Err(Error::StoreNotConfigured);
        }
        Ok(RestStoreConfig {
            url: self.store.url.trim_end_matches('/').to_string(),
            anon_key: self.store.anon_key.clone(),
            access_token: self.store.access_token.clone(),
            timeout_secs: self.store.timeout_secs,
        })
    }

    /// Copy of the configuration with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.llm.api_key.is_empty() {
            copy.llm.api_key = REDACTED.to_string();
        }
        if !copy.store.anon_key.is_empty() {
            copy.store.anon_key = REDACTED.to_string();
        }
        if copy.store.access_token.is_some() {
            copy.store.access_token = Some(REDACTED.to_string());
        }
        copy
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path.map(|p| PathBuf::from(expand_path(p))).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stellari")
            .join("config.toml")
    });

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Stellari Configuration

[llm]
# Messages API key. Leave empty to use the offline instruction template.
api_key = ""

# API base URL
base_url = "https://api.anthropic.com"

# Model identifier
model = "claude-sonnet-4-20250514"

# anthropic-version header
api_version = "2023-06-01"

# Token budgets
instructions_max_tokens = 2000
questions_max_tokens = 1000

# Request timeout in seconds
timeout_secs = 120

[store]
# Hosted database project URL (leave empty to disable persistence)
url = ""

# Public anonymous key
anon_key = ""

# Signed-in user token (optional)
# access_token = ""

# Request timeout in seconds
timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (comment out to disable file logging)
# file = "~/.stellari/logs/stellari.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
