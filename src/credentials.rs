//! Bearer token storage for the admin API.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "LIBRADMIN_TOKEN";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to access credentials at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Token must not be empty")]
    EmptyToken,
    #[error("No credentials file configured")]
    NotPersistent,
}

/// Where the active token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    File,
    None,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Read-mostly token store.
///
/// The token is looked up on every call to [`CredentialStore::token`], so a
/// login from another shell is picked up by a running watch.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    override_token: Option<String>,
}

impl CredentialStore {
    /// Store backed by `path`, with an optional token that takes precedence.
    pub fn new(path: PathBuf, override_token: Option<String>) -> Self {
        Self {
            path: Some(path),
            override_token: override_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Store holding a fixed token and no file.
    pub fn fixed(token: Option<String>) -> Self {
        Self {
            path: None,
            override_token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = &self.override_token {
            return Some(token.clone());
        }
        self.read_file().map(|stored| stored.token)
    }

    pub fn source(&self) -> TokenSource {
        if self.override_token.is_some() {
            TokenSource::Environment
        } else if self.read_file().is_some() {
            TokenSource::File
        } else {
            TokenSource::None
        }
    }

    /// When the stored token was saved.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.read_file().map(|stored| stored.saved_at)
    }

    /// Persist `token` to the credentials file.
    pub fn save(&self, token: &str) -> Result<(), CredentialError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        let path = self.path.as_ref().ok_or(CredentialError::NotPersistent)?;
        let io_err = |source: std::io::Error| CredentialError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(&StoredCredentials {
            token: token.to_string(),
            saved_at: Utc::now(),
        })
        .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        fs::write(path, body).map_err(io_err)?;
        restrict_permissions(path).map_err(io_err)?;

        debug!(path = %path.display(), "Saved credentials");
        Ok(())
    }

    /// Remove the credentials file. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, CredentialError> {
        let path = self.path.as_ref().ok_or(CredentialError::NotPersistent)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CredentialError::Io {
                path: path.clone(),
                source,
            }),
        }
    }

    fn read_file(&self) -> Option<StoredCredentials> {
        let path = self.path.as_ref()?;
        let contents = fs::read_to_string(path).ok()?;
        match serde_json::from_str::<StoredCredentials>(&contents) {
            Ok(stored) if !stored.token.is_empty() => Some(stored),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable credentials file");
                None
            }
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}
