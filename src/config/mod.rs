//! Configuration layer: typed settings with layered precedence (file → env).

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const LOCAL_CONFIG_BASENAME: &str = "riserva";
const DEFAULT_TTL_MS: u64 = 30_000;
const DEFAULT_MAX_ENTRIES: usize = 50;
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:3000";
const DEFAULT_RELEASE: &str = "dev";
const DEFAULT_OFFLINE_PATH: &str = "/offline.html";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Base log level for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

/// Settings for the read-through response cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseCacheSettings {
    /// Maximum age (ms) at which a cached entry is still served as fresh.
    pub ttl_ms: u64,
    /// Maximum number of entries held in the store.
    pub max_entries: usize,
    /// Base URL of the read-only posts API.
    pub api_base_url: String,
    /// Durable store location; `None` keeps the store in memory only.
    pub storage_path: Option<PathBuf>,
}

impl Default for ResponseCacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_path: None,
        }
    }
}

impl ResponseCacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Settings for the intercepting asset/fallback cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetCacheSettings {
    /// Release fingerprint (build time or content hash). Every deployment
    /// must supply a new value so activation invalidates prior generations.
    pub release: String,
    /// Origin whose requests are intercepted; everything else passes through.
    pub origin: String,
    /// Asset paths pre-populated into the critical generation at install.
    pub manifest: Vec<String>,
    /// Path of the static document served when network and cache both fail.
    pub offline_path: String,
}

impl Default for AssetCacheSettings {
    fn default() -> Self {
        Self {
            release: DEFAULT_RELEASE.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            manifest: Vec::new(),
            offline_path: DEFAULT_OFFLINE_PATH.to_string(),
        }
    }
}

impl AssetCacheSettings {
    /// Parse the configured origin, validating it is an absolute HTTP(S) URL.
    pub fn origin_url(&self) -> Result<url::Url, SettingsError> {
        let parsed = url::Url::parse(&self.origin).map_err(|err| SettingsError::Invalid {
            field: "asset_cache.origin",
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SettingsError::Invalid {
                field: "asset_cache.origin",
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }
        Ok(parsed)
    }
}

/// Top-level settings for both cache layers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub response_cache: ResponseCacheSettings,
    pub asset_cache: AssetCacheSettings,
}

impl Settings {
    /// Load settings from `riserva.toml` (if present) layered under
    /// `RISERVA_`-prefixed environment variables, optionally forcing a
    /// specific configuration file.
    pub fn load(config_file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder =
            Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("RISERVA").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.asset_cache.origin_url()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.response_cache.ttl_ms, 30_000);
        assert_eq!(settings.response_cache.max_entries, 50);
        assert!(settings.response_cache.storage_path.is_none());
        assert_eq!(settings.asset_cache.offline_path, "/offline.html");
        assert_eq!(settings.asset_cache.release, "dev");
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn ttl_converts_to_duration() {
        let cache = ResponseCacheSettings {
            ttl_ms: 1500,
            ..Default::default()
        };
        assert_eq!(cache.ttl(), Duration::from_millis(1500));
    }

    #[test]
    fn max_entries_clamps_to_min() {
        let cache = ResponseCacheSettings {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(cache.max_entries_non_zero().get(), 1);
    }

    #[test]
    fn origin_must_be_http() {
        let assets = AssetCacheSettings {
            origin: "ftp://example.org".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            assets.origin_url(),
            Err(SettingsError::Invalid { field, .. }) if field == "asset_cache.origin"
        ));
    }

    #[test]
    fn origin_parses_when_valid() {
        let assets = AssetCacheSettings::default();
        let origin = assets.origin_url().expect("default origin should parse");
        assert_eq!(origin.scheme(), "http");
    }
}
