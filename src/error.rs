//! Error types for the API client, the offline cache and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the backend REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        source: reqwest::Error,
    },

    #[error("Backend returned HTTP {code} for {url}")]
    Status { url: String, code: u16 },

    #[error("Could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("{message}")]
    Backend {
        message: String,
        detail: Option<String>,
    },

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// One-line text suitable for the dashboard banner and card error rows.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend { message, detail: Some(detail) } if !detail.trim().is_empty() => {
                format!("{}: {}", message, detail.trim())
            }
            other => other.to_string(),
        }
    }
}

/// Failure in the offline asset cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cache index at {path}: {source}")]
    Index {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Network fetch of {path} failed: {reason}")]
    Network { path: String, reason: String },

    #[error("{path} is not cached and the network is unreachable")]
    Offline { path: String },

    #[error("Invalid cache name: {0:?}")]
    InvalidName(String),
}

/// Failure loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to determine config directory")]
    NoConfigDir,
}
