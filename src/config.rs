//! Engine configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use validation::RetryPolicy;

use crate::error::{Error, Result};

/// Settings shared by validation and reverse construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attributes left out when snapshotting live state (e.g. "versions")
    pub ignore_list: Vec<String>,
    /// Number of resources validated concurrently
    pub jobs: usize,
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_list: Vec::new(),
            jobs: 4,
            retry: RetrySettings::default(),
        }
    }
}

/// `[retry]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub default_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            timeout_secs: policy.timeout.as_secs(),
            default_delay_ms: u64::try_from(policy.default_delay.as_millis()).unwrap_or(1000),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Whether `attribute` is excluded from snapshots
    pub fn ignores(&self, attribute: &str) -> bool {
        self.ignore_list.iter().any(|a| a == attribute)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.timeout_secs),
            Duration::from_millis(self.retry.default_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_retry_policy() {
        let config = Config::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(!config.ignores("versions"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
ignore_list = ["versions"]

[retry]
max_attempts = 3
"#,
        )
        .unwrap();

        assert!(config.ignores("versions"));
        assert_eq!(config.jobs, 4);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "jobs = 1").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("jobs = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
