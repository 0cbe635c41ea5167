use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Dashboard origin that receives the aggregated schedules.
pub const DEFAULT_SERVER_URL: &str = "https://narbut.app";

/// Base URL of the remote schedule API.
pub const DEFAULT_SCHEDULE_API_URL: &str = "https://api.kse.today";

/// Five minutes between scheduled runs.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Delay before the first run, giving the session time to settle.
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 3;

/// Storage key the schedule site writes its auth state under.
pub const DEFAULT_CREDENTIAL_KEY: &str = "__NEXUS_REACT_ADMIN_AUTH__";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SCHEDSYNC_CONFIG";

const APP_DIR: &str = "schedsync";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a one-line message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ingestion endpoint settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote schedule API settings
    #[serde(default)]
    pub schedule: ScheduleApiConfig,

    /// Run loop timing
    #[serde(default)]
    pub sync: SyncConfig,

    /// Where the session credential is read from
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Origin of the dashboard; `/api/sync-schedule` is appended
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleApiConfig {
    /// Base URL; `/schedule` is appended
    pub api_url: String,
}

impl Default for ScheduleApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SCHEDULE_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled runs (default: 300)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds before the first run after startup (default: 3)
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Skip a trigger while the previous run is still in flight
    #[serde(default)]
    pub skip_overlapping_runs: bool,

    /// Per-request timeout in seconds; 0 leaves the transport default
    #[serde(default)]
    pub request_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_initial_delay_secs() -> u64 {
    DEFAULT_INITIAL_DELAY_SECS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            skip_overlapping_runs: false,
            request_timeout_secs: 0,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    /// `None` when no explicit timeout is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Credential store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// JSON object file mapping storage keys to string values
    #[default]
    File,
    /// System keyring, one entry per storage key
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: CredentialBackend,

    /// Storage key holding the auth document
    #[serde(default = "default_credential_key")]
    pub key: String,

    /// Path of the storage file (file backend only)
    #[serde(default = "default_storage_path_str")]
    pub path: String,
}

fn default_credential_key() -> String {
    DEFAULT_CREDENTIAL_KEY.to_string()
}

fn default_storage_path_str() -> String {
    Config::default_config_dir()
        .join("local_storage.json")
        .to_string_lossy()
        .into_owned()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            key: default_credential_key(),
            path: default_storage_path_str(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.check()?;
        Ok((config, validation))
    }

    /// Validate and log warnings; errors become a `ConfigError::Invalid`.
    pub fn check(&self) -> Result<ValidationResult> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(validation)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.server.url, "server.url", &mut result);
        self.validate_url(&self.schedule.api_url, "schedule.api_url", &mut result);

        if self.sync.interval_secs == 0 {
            result.add_error("sync.interval_secs", "Sync interval must be greater than 0");
        } else if self.sync.interval_secs < 60 {
            result.add_warning(
                "sync.interval_secs",
                "Sync interval under a minute will hammer the schedule API",
            );
        }

        if self.sync.initial_delay_secs > self.sync.interval_secs {
            result.add_warning(
                "sync.initial_delay_secs",
                "Initial delay is longer than the sync interval",
            );
        }

        if self.credentials.key.trim().is_empty() {
            result.add_error("credentials.key", "Credential key must not be empty");
        }

        if self.credentials.backend == CredentialBackend::File {
            let path = PathBuf::from(&self.credentials.path);
            if path.is_dir() {
                result.add_error(
                    "credentials.path",
                    format!("Path is a directory: {}", path.display()),
                );
            } else if !path.exists() {
                result.add_warning(
                    "credentials.path",
                    format!("Storage file does not exist yet: {}", path.display()),
                );
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding the config and the default storage file
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Path to the configuration file, honoring `SCHEDSYNC_CONFIG`
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_default_endpoints_and_timing() {
        let config = Config::default();
        assert_eq!(config.server.url, "https://narbut.app");
        assert_eq!(config.schedule.api_url, "https://api.kse.today");
        assert_eq!(config.sync.interval(), Duration::from_millis(300_000));
        assert_eq!(config.sync.initial_delay(), Duration::from_secs(3));
        assert_eq!(config.sync.request_timeout(), None);
        assert_eq!(config.credentials.key, "__NEXUS_REACT_ADMIN_AUTH__");
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.server.url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "server.url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.schedule.api_url = "ftp://api.kse.today".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_interval_is_error() {
        let mut config = Config::default();
        config.sync.interval_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "sync.interval_secs"));
    }

    #[test]
    fn test_short_interval_is_warning() {
        let mut config = Config::default();
        config.sync.interval_secs = 10;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "sync.interval_secs"));
    }

    #[test]
    fn test_empty_key_is_error() {
        let mut config = Config::default();
        config.credentials.key = "  ".to_string();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_request_timeout() {
        let mut config = Config::default();
        config.sync.request_timeout_secs = 15;
        assert_eq!(config.sync.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.sync.interval_secs, DEFAULT_SYNC_INTERVAL_SECS);
    }

    #[test]
    fn test_load_from_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
url = "http://localhost:3000"

[sync]
interval_secs = 120

[credentials]
backend = "keyring"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.url, "http://localhost:3000");
        assert_eq!(config.schedule.api_url, DEFAULT_SCHEDULE_API_URL);
        assert_eq!(config.sync.interval_secs, 120);
        assert_eq!(config.sync.initial_delay_secs, DEFAULT_INITIAL_DELAY_SECS);
        assert_eq!(config.credentials.backend, CredentialBackend::Keyring);
        assert_eq!(config.credentials.key, DEFAULT_CREDENTIAL_KEY);
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\ninterval_secs = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
