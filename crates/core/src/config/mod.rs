//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFLINE_GATEWAY_*)
//! 2. TOML config file (if OFFLINE_GATEWAY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "OFFLINE_GATEWAY_";

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "OFFLINE_GATEWAY_CONFIG_FILE";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFLINE_GATEWAY_*)
/// 2. TOML config file (if OFFLINE_GATEWAY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The gateway's own origin. Requests to any other origin pass through.
    ///
    /// Set via OFFLINE_GATEWAY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the current cache generation. Bumping it is the only way to
    /// invalidate cached content.
    ///
    /// Set via OFFLINE_GATEWAY_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URLs pre-warmed into the generation at install time, in order.
    ///
    /// Set via OFFLINE_GATEWAY_MANIFEST environment variable (TOML array syntax).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFLINE_GATEWAY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network fetches.
    ///
    /// Set via OFFLINE_GATEWAY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via OFFLINE_GATEWAY_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of redirects followed per fetch.
    ///
    /// Set via OFFLINE_GATEWAY_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_version() -> String {
    "super-tool-v1".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/manifest.json".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offline-gateway.sqlite")
}

fn default_user_agent() -> String {
    "offline-gateway/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            manifest: default_manifest(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The configured origin parsed as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFLINE_GATEWAY_`
    /// 2. TOML file from `OFFLINE_GATEWAY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
        Self::load_from(config_file.as_deref())
    }

    /// Like [`load`](Self::load), but reads the TOML layer from an explicit
    /// path instead of `OFFLINE_GATEWAY_CONFIG_FILE`.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = config_file {
            figment = figment.merge(Toml::file(config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Extract and validate a configuration from a prepared figment.
    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.cache_version, "super-tool-v1");
        assert_eq!(config.manifest, vec!["/", "/manifest.json"]);
        assert_eq!(config.db_path, PathBuf::from("./offline-gateway.sqlite"));
        assert_eq!(config.user_agent, "offline-gateway/0.1");
        assert_eq!(config.max_redirects, 5);
        assert!(config.timeout_ms.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), None);

        let config = AppConfig { timeout_ms: Some(20_000), ..Default::default() };
        assert_eq!(config.timeout(), Some(Duration::from_millis(20_000)));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url().unwrap().as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_extract_from_toml() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(
            r#"
            origin = "https://supertool.example"
            cache_version = "super-tool-v2"
            manifest = ["/", "/manifest.json", "/offline"]
            "#,
        ));

        let config = AppConfig::extract(figment).unwrap();
        assert_eq!(config.origin, "https://supertool.example");
        assert_eq!(config.cache_version, "super-tool-v2");
        assert_eq!(config.manifest.len(), 3);
        assert_eq!(config.user_agent, "offline-gateway/0.1");
    }

    #[test]
    fn test_extract_rejects_invalid() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(r#"cache_version = """#));

        let result = AppConfig::extract(figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("offline-gateway-config-{}.toml", std::process::id()));
        std::fs::write(&path, "cache_version = \"super-tool-v7\"\nmanifest = [\"/\"]\n").unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.cache_version, "super-tool-v7");
        assert_eq!(config.manifest, vec!["/"]);
    }
}
