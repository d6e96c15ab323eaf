//! Ordering configuration
//!
//! ```yaml
//! version: 1
//! ordering:
//!   max_key_length: 40
//!   persist_timeout_ms: 10000
//!   refetch_on_commit: true
//!   error_message: "Error reordering items. Please try again."
//! ```

mod error;
mod io;

pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigFileV1, OrderingOverrides};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::health::DEFAULT_MAX_KEY_LENGTH;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

pub const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_ERROR_MESSAGE: &str = "Error reordering items. Please try again.";

/// Shortest threshold that still fits a reindexed list of any practical size
pub const MIN_MAX_KEY_LENGTH: usize = 8;

pub const MAX_MAX_KEY_LENGTH: usize = 1024;

/// Tunables of the ordering core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// Keys longer than this trigger a reindex
    pub max_key_length: usize,

    /// Upper bound for one backend write; `0` disables the timeout
    pub persist_timeout_ms: u64,

    /// Reload the list from the store after a successful write
    pub refetch_on_commit: bool,

    /// User-visible message set on rollback
    pub error_message: String,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            persist_timeout_ms: DEFAULT_PERSIST_TIMEOUT_MS,
            refetch_on_commit: true,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

impl OrderingConfig {
    pub fn max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    pub fn persist_timeout_ms(mut self, persist_timeout_ms: u64) -> Self {
        self.persist_timeout_ms = persist_timeout_ms;
        self
    }

    pub fn refetch_on_commit(mut self, refetch_on_commit: bool) -> Self {
        self.refetch_on_commit = refetch_on_commit;
        self
    }

    pub fn error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = error_message.into();
        self
    }

    pub fn persist_timeout(&self) -> Option<Duration> {
        (self.persist_timeout_ms > 0).then(|| Duration::from_millis(self.persist_timeout_ms))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(MIN_MAX_KEY_LENGTH..=MAX_MAX_KEY_LENGTH).contains(&self.max_key_length) {
            return Err(ConfigError::range_with_hint(
                "max_key_length",
                self.max_key_length,
                MIN_MAX_KEY_LENGTH,
                MAX_MAX_KEY_LENGTH,
                "Use 40 unless the backing column is narrower.",
            ));
        }
        if self.persist_timeout_ms > 600_000 {
            return Err(ConfigError::range_with_hint(
                "persist_timeout_ms",
                self.persist_timeout_ms,
                0,
                600_000,
                "Use 0 to disable the timeout.",
            ));
        }
        if self.error_message.trim().is_empty() {
            return Err(ConfigError::Empty("error_message".to_string()));
        }
        Ok(())
    }

    /// Load from a YAML file, starting from the defaults
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let mut config = Self::default();
        if let Some(overrides) = file.ordering {
            if let Some(v) = overrides.max_key_length {
                config.max_key_length = v;
            }
            if let Some(v) = overrides.persist_timeout_ms {
                config.persist_timeout_ms = v;
            }
            if let Some(v) = overrides.refetch_on_commit {
                config.refetch_on_commit = v;
            }
            if let Some(v) = overrides.error_message {
                config.error_message = v;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            ordering: Some(OrderingOverrides {
                max_key_length: Some(self.max_key_length),
                persist_timeout_ms: Some(self.persist_timeout_ms),
                refetch_on_commit: Some(self.refetch_on_commit),
                error_message: Some(self.error_message.clone()),
            }),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = OrderingConfig::default();
        assert_eq!(config.max_key_length, 40);
        assert_eq!(config.persist_timeout(), Some(Duration::from_secs(10)));
        assert!(config.refetch_on_commit);
        assert_eq!(config.error_message, "Error reordering items. Please try again.");
        assert!(config.validate().is_ok());
        assert_eq!(OrderingConfig::default().persist_timeout_ms(0).persist_timeout(), None);
    }

    #[test]
    fn test_yaml_loading() {
        let yaml_content = r#"
version: 1
ordering:
  max_key_length: 64
  refetch_on_commit: false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = OrderingConfig::from_yaml(temp_file.path()).unwrap();
        assert_eq!(config.max_key_length, 64);
        assert!(!config.refetch_on_commit);
        assert_eq!(config.persist_timeout_ms, DEFAULT_PERSIST_TIMEOUT_MS);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = OrderingConfig::default()
            .max_key_length(32)
            .error_message("Could not save the new order.");
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("max_key_length: 32"));
        assert_eq!(OrderingConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = OrderingConfig::from_yaml_str("ordering:\n  max_key_length: 40\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = OrderingConfig::from_yaml_str("version: 2\n");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_yaml_unknown_field() {
        let result = OrderingConfig::from_yaml_str("version: 1\nordering:\n  max_len: 40\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_range_validation() {
        let err = OrderingConfig::default().max_key_length(4).validate().unwrap_err();
        assert!(err.to_string().contains("max_key_length"));
        assert!(OrderingConfig::default().error_message("  ").validate().is_err());
        assert!(OrderingConfig::from_yaml_str("version: 1\nordering:\n  max_key_length: 2\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            OrderingConfig::from_yaml("/nonexistent/ordering.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
