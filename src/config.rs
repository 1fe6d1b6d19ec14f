//! Configuration for the dashboard.
//!
//! Located at `~/.config/home-server-manager/config.toml` (platform equivalent).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::api::RouteScheme;
use crate::error::ConfigError;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub dashboard: DashboardConfig,
    pub cache: CacheConfig,
}

/// Backend REST API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Which endpoint family the backend exposes ("containers" or "docker")
    pub routes: RouteScheme,
    /// Compose project key appended to per-service actions on the docker routes
    pub compose_key: Option<String>,
    /// Per-request timeout. Pulls can take minutes on the backend.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            routes: RouteScheme::Containers,
            compose_key: None,
            request_timeout_secs: 330,
        }
    }
}

/// Reconciliation timing after actions, plus the periodic refresh tick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    /// 0 disables the periodic refresh
    pub refresh_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            poll_interval_ms: 1000,
            max_polls: 15,
            refresh_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Services shown before the backend has answered
    pub services: Vec<String>,
    /// Ask for `y` before down, pull and the fleet actions
    pub confirm_destructive: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            confirm_destructive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub name: String,
    pub assets: Vec<String>,
    pub fallback: String,
    /// Overrides the platform cache directory
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "home-server-manager-v1".to_string(),
            assets: ["/", "/index.html", "/favicon.ico", "/manifest.json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback: "/index.html".to_string(),
            dir: None,
        }
    }
}

impl SyncConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}: api={}", path, config.api.base_url);
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.cache.name.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.name must not be empty".into()));
        }
        Ok(())
    }

    fn dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "home-server-manager").ok_or(ConfigError::NoConfigDir)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for the dashboard's rolling log files
    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::dirs()?.data_dir().join("logs"))
    }

    /// Root of the offline asset cache
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::dirs()?.cache_dir().join("assets")),
        }
    }
}
