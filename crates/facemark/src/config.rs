use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use facemark_core::DEFAULT_TARGET_SIZE;

/// Maximum accepted distance (0–255 scale) for a probe to count as a match.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 55.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("target_size must be at least 1px")]
    InvalidTargetSize,
    #[error("distance_threshold must be a finite, non-negative number, got {0}")]
    InvalidThreshold(f64),
}

/// Engine configuration, loaded from environment variables or a TOML document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database holding references and the ledger.
    pub db_path: PathBuf,
    /// Mean absolute RGB difference at or below which a probe matches.
    pub distance_threshold: f64,
    /// Edge length of normalized fingerprints.
    pub target_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(|key| std::env::var(key).ok()),
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            target_size: DEFAULT_TARGET_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from `FACEMARK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_size == 0 {
            return Err(ConfigError::InvalidTargetSize);
        }
        validate_threshold(self.distance_threshold)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("FACEMARK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_db_path(&lookup));

        Self {
            db_path,
            distance_threshold: parsed(&lookup, "FACEMARK_DISTANCE_THRESHOLD", DEFAULT_DISTANCE_THRESHOLD),
            target_size: parsed(&lookup, "FACEMARK_TARGET_SIZE", DEFAULT_TARGET_SIZE),
        }
    }
}

/// A threshold must be finite and non-negative.
pub fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(ConfigError::InvalidThreshold(threshold));
    }
    Ok(())
}

fn default_db_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facemark")
        .join("attendance.db")
}

fn parsed<T: std::str::FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
