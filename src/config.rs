//! Configuration Module
//!
//! Environment-driven settings read once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// TODO: Point this at the deployed API once it has a stable host
pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_CURRENCY: &str = "$";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "CARRENTAL_API_URL";
pub const ENV_CURRENCY: &str = "CARRENTAL_CURRENCY";
pub const ENV_TIMEOUT: &str = "CARRENTAL_HTTP_TIMEOUT_SECS";
pub const ENV_DATA_DIR: &str = "CARRENTAL_DATA_DIR";

/// Optional file in the working directory with the same keys
pub const ENV_FILE: &str = ".env";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL every API path is joined onto
    pub api_base_url: String,
    /// Display currency symbol or code
    pub currency: String,
    pub request_timeout: Duration,
    /// Overrides the default storage directory
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Read configuration from the environment, falling back to `.env`
    pub fn load() -> Result<Self, ConfigError> {
        let env_file = Path::new(ENV_FILE);
        if env_file.is_file() {
            debug!("Reading configuration overrides from {}", ENV_FILE);
            Self::from_env_file(env_file)
        } else {
            Self::from_env()
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Process environment first, then the values in `path`.
    ///
    /// The file is only read; the process environment is left untouched.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let file = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout = match non_empty(ENV_TIMEOUT) {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
                if secs == 0 {
                    return Err(ConfigError::InvalidTimeout(raw));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url: non_empty(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            currency: non_empty(ENV_CURRENCY).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            request_timeout,
            data_dir: non_empty(ENV_DATA_DIR).map(PathBuf::from),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            data_dir: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CARRENTAL_HTTP_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),

    #[error("Failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_all_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://api.example.com"),
            (ENV_CURRENCY, "EUR"),
            (ENV_TIMEOUT, "5"),
            (ENV_DATA_DIR, "/tmp/rental"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/rental")));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[(ENV_API_URL, "  "), (ENV_CURRENCY, "")])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.currency, DEFAULT_CURRENCY);
    }

    #[test]
    fn env_file_fills_in_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# local overrides\nCARRENTAL_CURRENCY=EUR\nCARRENTAL_HTTP_TIMEOUT_SECS=7\n",
        )
        .unwrap();

        let config = Config::from_env_file(&path).unwrap();
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_env_file(&dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile(_)));
    }

    #[test]
    fn rejects_bad_timeouts() {
        for raw in ["soon", "0", "-3"] {
            let err = Config::from_lookup(lookup_from(&[(ENV_TIMEOUT, raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTimeout(_)), "{raw}");
        }
    }
}
