//! Layered configuration for the node harness.
//!
//! Values are resolved from built-in defaults, an optional TOML file and
//! `STORY_MEMORY_*` environment variables, in that order of precedence.
//! Nested keys use `__` as separator, e.g. `STORY_MEMORY_CREDENTIALS__API_KEY`.

use crate::credentials::DEFAULT_BASE_URL;
use crate::{Error, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "STORY_MEMORY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub http: HttpConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

/// Stored credential values
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub api_key: String,
    pub base_url: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("story-memory-node/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Record per-item failures as data instead of aborting the run
    pub continue_on_fail: bool,
    /// Reuse one response for items resolving to the same request
    pub coalesce_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `story_memory_node=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::invalid_input(
                "logging.format",
                format!("unknown log format '{other}', expected 'pretty' or 'json'"),
            )),
        }
    }
}

/// Command-line values that take precedence over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub continue_on_fail: Option<bool>,
    pub coalesce_requests: Option<bool>,
}

impl Config {
    /// Default location of the config file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("story-memory-node").join("config.toml"))
    }

    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(
                        File::from(default_path)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(api_key) = &overrides.api_key {
            self.credentials.api_key.clone_from(api_key);
        }
        if let Some(base_url) = &overrides.base_url {
            self.credentials.base_url.clone_from(base_url);
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(continue_on_fail) = overrides.continue_on_fail {
            self.execution.continue_on_fail = continue_on_fail;
        }
        if let Some(coalesce) = overrides.coalesce_requests {
            self.execution.coalesce_requests = coalesce;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let base_url = self.credentials.base_url.trim();
        if base_url.is_empty() {
            return Err(Error::invalid_input(
                "credentials.base_url",
                "base URL cannot be empty",
            ));
        }

        let parsed = url::Url::parse(base_url).map_err(|e| {
            Error::invalid_input("credentials.base_url", format!("invalid URL: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_input(
                "credentials.base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_input(
                "http.timeout_secs",
                "timeout must be greater than zero",
            ));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(Error::invalid_input(
                "http.connect_timeout_secs",
                "connect timeout must be greater than zero",
            ));
        }

        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            Error::invalid_input("logging.level", format!("invalid filter directive: {e}"))
        })?;

        Ok(())
    }
}
