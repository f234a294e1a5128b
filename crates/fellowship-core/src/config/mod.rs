//! Configuration loading and validation.
//!
//! JSON5 format. Config location: `~/.fellowship/fellowship.json`, or
//! `$FELLOWSHIP_STATE_DIR/fellowship.json` when that variable is set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::validation::validate_email;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Auth/data backend connection.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Identity resolution settings.
    #[serde(default)]
    pub auth: AuthSettings,

    /// Global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("fellowship.json")
    }

    /// Get the Fellowship state directory.
    ///
    /// Uses `FELLOWSHIP_STATE_DIR` env var if set, otherwise `~/.fellowship`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("FELLOWSHIP_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".fellowship")
        } else {
            PathBuf::from(".fellowship")
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Backend timeout cannot be 0".to_string(),
            ));
        }

        if self.backend.admin_table.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Backend admin table cannot be empty".to_string(),
            ));
        }

        self.auth.validate()
    }
}

/// Auth/data backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the backend project.
    #[serde(default)]
    pub url: Option<String>,

    /// Public (anonymous) API key sent with every request.
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Table holding per-user privilege records.
    #[serde(default = "default_admin_table")]
    pub admin_table: String,

    /// Request timeout in seconds.
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL, or an error if not configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if the URL is unset or blank.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError::MissingField("backend.url".to_string()))
    }

    /// Anonymous key, or an error if not configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if the key is unset or blank.
    pub fn require_anon_key(&self) -> Result<&str, ConfigError> {
        self.anon_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingField("backend.anonKey".to_string()))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            admin_table: default_admin_table(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_admin_table() -> String {
    "admins".to_string()
}

const fn default_backend_timeout() -> u64 {
    10
}

/// Identity resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSettings {
    /// Email granted admin without a privilege lookup.
    #[serde(default)]
    pub fallback_admin_email: Option<String>,

    /// Upper bound on a privilege lookup, in milliseconds.
    #[serde(default = "default_admin_lookup_timeout")]
    pub admin_lookup_timeout_ms: u64,

    /// Upper bound on the initial loading phase, in milliseconds.
    #[serde(default = "default_safety_deadline")]
    pub safety_deadline_ms: u64,
}

impl AuthSettings {
    /// Privilege lookup timeout.
    #[must_use]
    pub const fn admin_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.admin_lookup_timeout_ms)
    }

    /// Safety deadline for leaving the initializing phase.
    #[must_use]
    pub const fn safety_deadline(&self) -> Duration {
        Duration::from_millis(self.safety_deadline_ms)
    }

    /// Set the fallback admin email.
    #[must_use]
    pub fn with_fallback_admin(mut self, email: impl Into<String>) -> Self {
        self.fallback_admin_email = Some(email.into());
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_lookup_timeout_ms == 0 || self.safety_deadline_ms == 0 {
            return Err(ConfigError::Validation(
                "Auth timeouts cannot be 0".to_string(),
            ));
        }

        if self.admin_lookup_timeout_ms >= self.safety_deadline_ms {
            return Err(ConfigError::Validation(format!(
                "Admin lookup timeout ({}ms) must be shorter than the safety deadline ({}ms)",
                self.admin_lookup_timeout_ms, self.safety_deadline_ms
            )));
        }

        if let Some(email) = &self.fallback_admin_email {
            validate_email(email).map_err(|e| {
                ConfigError::Validation(format!("auth.fallbackAdminEmail: {e}"))
            })?;
        }

        Ok(())
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            fallback_admin_email: None,
            admin_lookup_timeout_ms: default_admin_lookup_timeout(),
            safety_deadline_ms: default_safety_deadline(),
        }
    }
}

const fn default_admin_lookup_timeout() -> u64 {
    3000
}

const fn default_safety_deadline() -> u64 {
    8000
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Log format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.auth.admin_lookup_timeout(), Duration::from_millis(3000));
        assert_eq!(config.auth.safety_deadline(), Duration::from_millis(8000));
        assert_eq!(config.backend.admin_table, "admins");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("fellowship.json");

        let mut config = Config::default();
        config.backend.url = Some("https://db.example.org".to_string());
        config.auth = config.auth.with_fallback_admin("ops@example.org");

        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.auth, config.auth);
        assert_eq!(loaded.backend.url.as_deref(), Some("https://db.example.org"));
    }

    #[test]
    fn test_json5_parsing() {
        let json5_content = r#"{
            // Campus project
            backend: {
                url: "https://db.example.org/",
                anonKey: "anon",
            },
            auth: {
                fallbackAdminEmail: "ops@example.org",
                adminLookupTimeoutMs: 1500,
            },
            settings: { logFormat: "json", },
        }"#;

        let config: Config = json5::from_str(json5_content).unwrap();
        assert_eq!(config.backend.require_url().unwrap(), "https://db.example.org");
        assert_eq!(config.backend.require_anon_key().unwrap(), "anon");
        assert_eq!(config.auth.admin_lookup_timeout_ms, 1500);
        assert_eq!(config.auth.safety_deadline_ms, 8000);
        assert_eq!(config.settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_backend_fields() {
        let config = Config::default();
        assert!(matches!(
            config.backend.require_url(),
            Err(ConfigError::MissingField(field)) if field == "backend.url"
        ));
        assert!(config.backend.require_anon_key().is_err());
    }

    #[test]
    fn test_lookup_timeout_must_fit_inside_deadline() {
        let mut config = Config::default();
        config.auth.admin_lookup_timeout_ms = 9000;
        assert!(config.validate().is_err());

        config.auth.admin_lookup_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_fallback_email_rejected() {
        let mut config = Config::default();
        config.auth.fallback_admin_email = Some("not-an-email".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_state_dir() {
        let dir = Config::state_dir();
        assert!(dir.to_str().unwrap().contains("fellowship"));
    }
}
