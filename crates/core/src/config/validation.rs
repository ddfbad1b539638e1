//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::request::resolve;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL, or carries a path/query
    /// - `cache_version` is empty or contains whitespace
    /// - a `manifest` entry is empty or resolves to another origin
    /// - `user_agent` is empty
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(invalid("origin", "must not carry a path or query"));
        }

        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }
        if self.cache_version.chars().any(char::is_whitespace) {
            return Err(invalid("cache_version", "must not contain whitespace"));
        }

        for entry in &self.manifest {
            let resolved = resolve(&origin, entry).map_err(|e| invalid("manifest", format!("{entry}: {e}")))?;
            if resolved.origin() != origin.origin() {
                return Err(invalid("manifest", format!("{entry} is not on origin {}", self.origin)));
            }
        }

        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; install will only create the cache generation");
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(invalid("timeout_ms", "must be at least 100ms"));
            }
            if timeout_ms > 300_000 {
                return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
            }
        }

        Ok(())
    }

    /// Check that a database path is configured (for adapters that persist).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `db_path` is empty.
    pub fn require_db_path(&self) -> Result<&std::path::Path, ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set OFFLINE_GATEWAY_DB_PATH environment variable".into(),
            });
        }
        Ok(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_not_url() {
        let config = AppConfig { origin: "localhost".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_origin_with_path() {
        let config = AppConfig { origin: "http://localhost:3000/app".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://localhost".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_empty_cache_version() {
        let config = AppConfig { cache_version: "  ".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("cache_version"));
    }

    #[test]
    fn test_validate_cross_origin_manifest() {
        let config = AppConfig {
            manifest: vec!["/".into(), "https://cdn.example.com/app.js".into()],
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()).as_deref(), Some("manifest"));
    }

    #[test]
    fn test_validate_absolute_same_origin_manifest() {
        let config = AppConfig { manifest: vec!["http://localhost:3000/offline".into()], ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: Some(50), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: Some(301_000), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: Some(100), ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { timeout_ms: Some(300_000), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_db_path() {
        let config = AppConfig::default();
        assert!(config.require_db_path().is_ok());

        let config = AppConfig { db_path: std::path::PathBuf::new(), ..Default::default() };
        assert!(matches!(config.require_db_path(), Err(ConfigError::Missing { .. })));
    }
}
