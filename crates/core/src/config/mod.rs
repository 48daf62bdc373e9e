//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REVCACHE_*)
//! 2. TOML config file (if REVCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Destination;

mod validation;

pub use validation::ConfigError;

/// Partition used by the revision-checked strategy.
pub const REVISION_CACHE_NAME: &str = "runtime-revision";

/// Partition used by the destination-based cache-first strategy.
pub const RUNTIME_CACHE_NAME: &str = "runtime";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REVCACHE_*)
/// 2. TOML config file (if REVCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker serves; manifest routes resolve against it.
    ///
    /// Set via REVCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via REVCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the injected runtime manifest (`[[route, revision], ...]`).
    ///
    /// Set via REVCACHE_MANIFEST_PATH environment variable. Without it the
    /// manifest is empty and every revision-partition entry is stale.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Request destinations served cache-first from the runtime partition.
    ///
    /// Set via REVCACHE_CACHE_FIRST_DESTINATIONS environment variable.
    #[serde(default = "default_cache_first_destinations")]
    pub cache_first_destinations: Vec<Destination>,

    /// Partition name for revision-checked entries.
    #[serde(default = "default_revision_cache_name")]
    pub revision_cache_name: String,

    /// Partition name for cache-first entries.
    #[serde(default = "default_runtime_cache_name")]
    pub runtime_cache_name: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via REVCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via REVCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via REVCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./revcache.sqlite")
}

fn default_cache_first_destinations() -> Vec<Destination> {
    vec![Destination::Font, Destination::Image]
}

fn default_revision_cache_name() -> String {
    REVISION_CACHE_NAME.into()
}

fn default_runtime_cache_name() -> String {
    RUNTIME_CACHE_NAME.into()
}

fn default_user_agent() -> String {
    "revcache/0.1".into()
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024 // 20MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            manifest_path: None,
            cache_first_destinations: default_cache_first_destinations(),
            revision_cache_name: default_revision_cache_name(),
            runtime_cache_name: default_runtime_cache_name(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed worker origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not a valid URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REVCACHE_`
    /// 2. TOML file from `REVCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REVCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REVCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Manifest path, required by hosts that cannot run with an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the manifest path is not set.
    pub fn require_manifest_path(&self) -> Result<&PathBuf, ConfigError> {
        self.manifest_path.as_ref().ok_or_else(|| ConfigError::Missing {
            field: "manifest_path".into(),
            hint: "Set REVCACHE_MANIFEST_PATH environment variable".into(),
        })
    }
}
