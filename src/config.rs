//! Configuration file parser for `berita.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, but each one is logged as a warning
//! since it is most likely a typo.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::content::Language;
use crate::feed::{SourceDescriptor, SourceRegistry};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but is out of range or unsupported.
    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level pipeline configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Source lists left out of the file fall back to the built-in registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the per-run index stores.
    pub index_dir: PathBuf,

    /// Central article database (SQLite file).
    pub database: PathBuf,

    /// Number of positions between batch commits.
    pub batch_size: usize,

    /// Articles extracted concurrently. 1 = strictly sequential.
    pub concurrency: usize,

    /// Per-request timeout for feeds, site roots and article pages.
    pub fetch_timeout_secs: u64,

    /// Overall time limit of a processing pass. None = unlimited.
    pub run_deadline_secs: Option<u64>,

    /// Maximum size of a downloaded document.
    pub max_page_bytes: usize,

    pub user_agent: String,

    /// Language profile for article extraction ("id" or "en").
    pub language: String,

    /// Retry records with this many failed re-attempts are no longer picked up.
    pub max_retry_attempts: i64,

    pub feeds: Option<Vec<SourceDescriptor>>,
    pub sites: Option<Vec<SourceDescriptor>>,
    pub feed_run_sites: Option<Vec<SourceDescriptor>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("."),
            database: PathBuf::from("berita.db"),
            batch_size: 100,
            concurrency: 1,
            fetch_timeout_secs: 30,
            run_deadline_secs: None,
            max_page_bytes: 10 * 1024 * 1024,
            user_agent: format!("berita/{}", env!("CARGO_PKG_VERSION")),
            language: "id".to_string(),
            max_retry_attempts: 5,
            feeds: None,
            sites: None,
            feed_run_sites: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 13] = [
        "index_dir",
        "database",
        "batch_size",
        "concurrency",
        "fetch_timeout_secs",
        "run_deadline_secs",
        "max_page_bytes",
        "user_agent",
        "language",
        "max_retry_attempts",
        "feeds",
        "sites",
        "feed_run_sites",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            index_dir = %config.index_dir.display(),
            database = %config.database.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        self.language()?;
        Ok(())
    }

    pub fn language(&self) -> Result<Language, ConfigError> {
        self.language
            .parse()
            .map_err(|reason| ConfigError::Invalid {
                key: "language",
                reason,
            })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }

    /// Built-in sources, with each list replaced when the file provides one.
    pub fn registry(&self) -> SourceRegistry {
        let defaults = SourceRegistry::default();
        SourceRegistry {
            feeds: self.feeds.clone().unwrap_or(defaults.feeds),
            feed_run_sites: self.feed_run_sites.clone().unwrap_or(defaults.feed_run_sites),
            sites: self.sites.clone().unwrap_or(defaults.sites),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
