//! Error types shared by the configuration loader, the secret cache and the
//! distribution engine.
//!
//! Adapters that shell out (`runner`, `vault`, `repo`) report plain
//! [`anyhow::Error`]s. The types here are the ones the core hands around.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Fatal error raised while obtaining the initial configuration.
#[derive(Debug, Error)]
pub enum ConfigParseError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML configuration in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON configuration in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A vault read failure as stored in the secret cache.
///
/// Holds the rendered error chain so every requester of the same reference
/// gets an identical copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CachedError {
    message: String,
}

impl CachedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for CachedError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the whole context chain on one line
        Self::new(format!("{err:#}"))
    }
}

/// Which stage a secret failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The vault reference could not be read.
    Resolution,
    /// The resolved value could not be written to the repository.
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Resolution => f.write_str("resolution"),
            FailureKind::Write => f.write_str("write"),
        }
    }
}

/// One failed secret inside a repository run. Never carries the secret value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind} of secret {secret} ({reference}) for repository {repository} failed: {message}")]
pub struct SecretFailure {
    pub repository: String,
    pub secret: String,
    pub reference: String,
    pub kind: FailureKind,
    pub message: String,
}
