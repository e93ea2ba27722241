//! Backend environment selection (local vs production).
//!
//! Every request reads the base URL from [`EnvironmentContext`] when it is
//! made, so a switch redirects all subsequent traffic immediately. Switching
//! into production is a two-step operation: [`EnvironmentContext::request_switch`]
//! hands back a [`PendingSwitch`] that must be explicitly confirmed.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Unknown environment: {0} (expected 'local' or 'production')")]
    Unknown(String),
    #[error("Failed to persist environment to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Pending switch was issued by a different context")]
    ForeignSwitch,
}

/// Backend deployment targeted by requests.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
        }
    }

    /// Switching into this environment needs an explicit confirmation.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" | "prod" => Ok(Self::Production),
            other => Err(EnvironmentError::Unknown(other.to_string())),
        }
    }
}

/// Base URLs for each environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentUrls {
    pub local: String,
    pub production: String,
}

impl EnvironmentUrls {
    pub fn get(&self, env: Environment) -> &str {
        match env {
            Environment::Local => &self.local,
            Environment::Production => &self.production,
        }
    }
}

/// On-disk form of the selected environment.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEnvironment {
    environment: Environment,
}

/// Process-wide environment selection.
#[derive(Debug)]
pub struct EnvironmentContext {
    id: u64,
    urls: EnvironmentUrls,
    current: RwLock<Environment>,
    state_path: Option<PathBuf>,
}

/// Outcome of [`EnvironmentContext::request_switch`].
#[derive(Debug)]
#[must_use]
pub enum SwitchRequest {
    /// Already in the requested environment.
    Unchanged(Environment),
    /// Switched without confirmation.
    Switched(Environment),
    /// Switch is held until confirmed or cancelled.
    NeedsConfirmation(PendingSwitch),
}

/// A switch into an environment that needs confirmation.
#[derive(Debug)]
#[must_use = "a pending switch does nothing until confirmed"]
pub struct PendingSwitch {
    context_id: u64,
    from: Environment,
    target: Environment,
}

impl PendingSwitch {
    pub fn from(&self) -> Environment {
        self.from
    }

    pub fn target(&self) -> Environment {
        self.target
    }

    /// Apply the switch.
    pub fn confirm(self, ctx: &EnvironmentContext) -> Result<Environment, EnvironmentError> {
        if ctx.id != self.context_id {
            return Err(EnvironmentError::ForeignSwitch);
        }
        info!(from = %self.from, to = %self.target, "Environment switch confirmed");
        ctx.apply(self.target)?;
        Ok(self.target)
    }

    /// Drop the switch, leaving the environment unchanged.
    pub fn cancel(self) -> Environment {
        debug!(target_env = %self.target, "Environment switch cancelled");
        self.from
    }
}

fn next_context_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

impl EnvironmentContext {
    /// In-memory context; switches are not persisted.
    pub fn new(urls: EnvironmentUrls, initial: Environment) -> Self {
        Self {
            id: next_context_id(),
            urls,
            current: RwLock::new(initial),
            state_path: None,
        }
    }

    /// Load the persisted selection from `state_path`, or use `default` if
    /// nothing valid has been persisted yet.
    pub fn load(urls: EnvironmentUrls, state_path: PathBuf, default: Environment) -> Self {
        let initial = match read_persisted(&state_path) {
            Some(env) => {
                debug!(environment = %env, path = %state_path.display(), "Loaded persisted environment");
                env
            }
            None => default,
        };
        Self {
            id: next_context_id(),
            urls,
            current: RwLock::new(initial),
            state_path: Some(state_path),
        }
    }

    pub fn current(&self) -> Environment {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Base URL of the current environment, without trailing slash.
    pub fn base_url(&self) -> String {
        self.url_for(self.current()).trim_end_matches('/').to_string()
    }

    pub fn url_for(&self, env: Environment) -> &str {
        self.urls.get(env)
    }

    pub fn urls(&self) -> &EnvironmentUrls {
        &self.urls
    }

    /// Start a switch to `target`.
    ///
    /// Switches that do not need confirmation are applied before returning.
    pub fn request_switch(&self, target: Environment) -> Result<SwitchRequest, EnvironmentError> {
        let from = self.current();
        if from == target {
            return Ok(SwitchRequest::Unchanged(target));
        }
        if target.requires_confirmation() {
            return Ok(SwitchRequest::NeedsConfirmation(PendingSwitch {
                context_id: self.id,
                from,
                target,
            }));
        }
        info!(from = %from, to = %target, "Switching environment");
        self.apply(target)?;
        Ok(SwitchRequest::Switched(target))
    }

    fn apply(&self, target: Environment) -> Result<(), EnvironmentError> {
        if let Some(path) = &self.state_path {
            write_persisted(path, target)?;
        }
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = target;
        Ok(())
    }
}

fn read_persisted(path: &Path) -> Option<Environment> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<PersistedEnvironment>(&contents) {
        Ok(persisted) => Some(persisted.environment),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable environment state");
            None
        }
    }
}

fn write_persisted(path: &Path, environment: Environment) -> Result<(), EnvironmentError> {
    let persist_err = |source: std::io::Error| EnvironmentError::Persist {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }
    let body = serde_json::to_string_pretty(&PersistedEnvironment { environment })
        .map_err(|e| persist_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    fs::write(path, body).map_err(persist_err)
}
