//! Configuration management for libradmin using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::{CredentialStore, TOKEN_ENV};
use crate::environment::{Environment, EnvironmentContext, EnvironmentUrls};

/// Default base URL for a locally running API.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:8000";

/// Default base URL for the production API.
pub const DEFAULT_PRODUCTION_URL: &str = "https://api.example-reader.com";

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Shortest poll interval accepted from config or flags.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

const ENVIRONMENT_STATE_FILE: &str = "environment.json";
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
    #[error("Invalid URL for {key}: {value} ({message})")]
    InvalidUrl {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding persisted state (environment selection, credentials).
    pub data_dir: PathBuf,
    /// Base URL of the local API.
    pub local_url: String,
    /// Base URL of the production API.
    pub production_url: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Environment used when nothing has been persisted yet.
    pub default_environment: Environment,
    /// Token that overrides the credentials file (LIBRADMIN_TOKEN).
    pub token_override: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: config dir -> home dir -> current dir
        let data_dir = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("libradmin");

        Self {
            data_dir,
            local_url: DEFAULT_LOCAL_URL.to_string(),
            production_url: DEFAULT_PRODUCTION_URL.to_string(),
            request_timeout: 30,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_environment: Environment::Local,
            token_override: None,
        }
    }
}

impl Settings {
    pub fn environment_state_path(&self) -> PathBuf {
        self.data_dir.join(ENVIRONMENT_STATE_FILE)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn environment_urls(&self) -> EnvironmentUrls {
        EnvironmentUrls {
            local: self.local_url.clone(),
            production: self.production_url.clone(),
        }
    }

    /// Environment context backed by the persisted selection.
    pub fn environment_context(&self) -> EnvironmentContext {
        EnvironmentContext::load(
            self.environment_urls(),
            self.environment_state_path(),
            self.default_environment,
        )
    }

    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(self.credentials_path(), self.token_override.clone())
    }

    /// Check that both base URLs parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("local_url", &self.local_url)?;
        validate_url("production_url", &self.production_url)?;
        Ok(())
    }
}

fn validate_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        message,
    };
    let parsed = url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_environment: Option<Environment>,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers libradmin config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("libradmin").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_err = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_err("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_err("JSON", e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref url) = self.local_url {
            settings.local_url = url.clone();
        }
        if let Some(ref url) = self.production_url {
            settings.production_url = url.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(interval) = self.poll_interval_ms {
            settings.poll_interval_ms = interval;
        }
        if let Some(env) = self.default_environment {
            settings.default_environment = env;
        }
    }
}

/// Options for locating configuration.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file (--config).
    pub config_path: Option<PathBuf>,
}

/// Environment variable overrides, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub data_dir: Option<String>,
    pub local_url: Option<String>,
    pub production_url: Option<String>,
    pub poll_interval_ms: Option<String>,
    pub token: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|s| !s.is_empty());
        Self {
            data_dir: var("LIBRADMIN_DATA_DIR"),
            local_url: var("LIBRADMIN_LOCAL_URL"),
            production_url: var("LIBRADMIN_PRODUCTION_URL"),
            poll_interval_ms: var("LIBRADMIN_POLL_INTERVAL_MS"),
            token: var(TOKEN_ENV),
        }
    }

    /// Environment variables take highest precedence.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref dir) = self.data_dir {
            tracing::debug!("Using LIBRADMIN_DATA_DIR from environment: {}", dir);
            settings.data_dir = PathBuf::from(shellexpand::tilde(dir).as_ref());
        }
        if let Some(ref url) = self.local_url {
            tracing::debug!("Using LIBRADMIN_LOCAL_URL from environment: {}", url);
            settings.local_url = url.clone();
        }
        if let Some(ref url) = self.production_url {
            tracing::debug!("Using LIBRADMIN_PRODUCTION_URL from environment: {}", url);
            settings.production_url = url.clone();
        }
        if let Some(ref raw) = self.poll_interval_ms {
            match raw.parse::<u64>() {
                Ok(ms) => settings.poll_interval_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid LIBRADMIN_POLL_INTERVAL_MS: {}", raw),
            }
        }
        if self.token.is_some() {
            tracing::debug!("Using {} from environment", TOKEN_ENV);
            settings.token_override = self.token.clone();
        }
    }
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions) -> Result<Config, ConfigError> {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path).await;
    }

    // Priority 2: Auto-discover via prefer
    Ok(Config::load().await)
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = load_file_config(&options).await?;
    let settings = build_settings(&config, &EnvOverrides::from_env())?;
    Ok((settings, config))
}

/// Merge defaults, file config and environment overrides.
pub fn build_settings(config: &Config, env: &EnvOverrides) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);
    env.apply_to_settings(&mut settings);

    settings.validate()?;
    Ok(settings)
}
