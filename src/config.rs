//! Configuration management for db-probe.
//!
//! Handles loading configuration from TOML files and environment variables,
//! with support for named connection profiles and a default statement.

use crate::credentials::ENV_PROVIDER;
use crate::error::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for db-probe.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named connection profiles.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionProfile>,

    /// Query defaults.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryConfig {
    /// Statement to run when none is given on the command line.
    pub sql: Option<String>,

    /// Rows requested per fetch.
    pub fetch_size: Option<usize>,
}

/// A partially specified connection, as found in a config file profile, on
/// the command line, or in the environment. Layers are merged and then
/// [`build`](ConnectionProfile::build) into a [`ConnectionConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Engine endpoint URL; its scheme selects the driver.
    pub endpoint: Option<String>,

    /// Opaque staging location handed to the engine.
    pub staging_location: Option<String>,

    /// Credential provider identifier (`env`, `properties-file`, `static`).
    pub credential_provider: Option<String>,

    /// Opaque credential provider arguments.
    pub credential_args: Option<String>,

    /// Log file path.
    pub log_path: Option<PathBuf>,
}

impl ConnectionProfile {
    /// Merges another profile into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ConnectionProfile) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
        if other.staging_location.is_some() {
            self.staging_location = other.staging_location.clone();
        }
        if other.credential_provider.is_some() {
            self.credential_provider = other.credential_provider.clone();
        }
        if other.credential_args.is_some() {
            self.credential_args = other.credential_args.clone();
        }
        if other.log_path.is_some() {
            self.log_path = other.log_path.clone();
        }
    }

    /// Applies environment variables (DBPROBE_ENDPOINT, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.endpoint.is_none() {
            self.endpoint = std::env::var("DBPROBE_ENDPOINT").ok();
        }
        if self.staging_location.is_none() {
            self.staging_location = std::env::var("DBPROBE_STAGING_LOCATION").ok();
        }
        if self.credential_provider.is_none() {
            self.credential_provider = std::env::var("DBPROBE_CREDENTIAL_PROVIDER").ok();
        }
        if self.credential_args.is_none() {
            self.credential_args = std::env::var("DBPROBE_CREDENTIAL_ARGS").ok();
        }
        if self.log_path.is_none() {
            self.log_path = std::env::var_os("DBPROBE_LOG_PATH").map(PathBuf::from);
        }
    }

    /// Validates the profile and freezes it into a connection config.
    pub fn build(&self) -> Result<ConnectionConfig> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProbeError::config("Endpoint is required"))?;

        Url::parse(endpoint)
            .map_err(|e| ProbeError::config(format!("Invalid endpoint '{endpoint}': {e}")))?;

        Ok(ConnectionConfig {
            endpoint: endpoint.to_string(),
            staging_location: self.staging_location.clone().unwrap_or_default(),
            credential_provider: self
                .credential_provider
                .clone()
                .unwrap_or_else(|| ENV_PROVIDER.to_string()),
            credential_args: self.credential_args.clone().unwrap_or_default(),
            log_path: self.log_path.clone(),
        })
    }
}

/// Connection configuration handed to a driver. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    endpoint: String,
    staging_location: String,
    credential_provider: String,
    credential_args: String,
    log_path: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Creates a config with the default (`env`) credential provider.
    pub fn new(endpoint: impl Into<String>, staging_location: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            staging_location: staging_location.into(),
            credential_provider: ENV_PROVIDER.to_string(),
            credential_args: String::new(),
            log_path: None,
        }
    }

    /// Sets the credential provider identifier and its arguments.
    pub fn with_credentials(mut self, provider: impl Into<String>, args: impl Into<String>) -> Self {
        self.credential_provider = provider.into();
        self.credential_args = args.into();
        self
    }

    /// Sets the log destination.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn staging_location(&self) -> &str {
        &self.staging_location
    }

    pub fn credential_provider(&self) -> &str {
        &self.credential_provider
    }

    pub fn credential_args(&self) -> &str {
        &self.credential_args
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Returns a display-safe string (no credential arguments) for logs.
    pub fn display_string(&self) -> String {
        if self.staging_location.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{} (staging: {})", self.endpoint, self.staging_location)
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-probe")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ProbeError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection profile, or the default profile if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionProfile> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[query]
sql = "SELECT * FROM sampledata.sesblog limit 10"
fetch_size = 50

[connections.default]
endpoint = "mock://engine"
staging_location = "mock://bucket/path"
credential_provider = "properties-file"
credential_args = "athena_creds"
log_path = "./athena_jdbc.log"

[connections.local]
endpoint = "mock://local"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.query.sql.as_deref(),
            Some("SELECT * FROM sampledata.sesblog limit 10")
        );
        assert_eq!(config.query.fetch_size, Some(50));

        let default_conn = config.connections.get("default").unwrap();
        assert_eq!(default_conn.endpoint.as_deref(), Some("mock://engine"));
        assert_eq!(default_conn.credential_args.as_deref(), Some("athena_creds"));
        assert_eq!(
            default_conn.log_path.as_deref(),
            Some(Path::new("./athena_jdbc.log"))
        );

        let local = config.connections.get("local").unwrap();
        assert_eq!(local.staging_location, None);
    }

    #[test]
    fn test_parse_invalid_config_names_file() {
        let err = Config::parse_toml("[connections.default]\nendpoint = 42", Path::new("x.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("x.toml"));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = Config::load_from_file(Path::new("/nonexistent/db-probe.toml")).unwrap();
        assert!(config.connections.is_empty());
        assert!(config.query.sql.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connections.default]\nendpoint = \"mock://engine\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(config.get_connection(None).is_some());
    }

    #[test]
    fn test_build_applies_defaults() {
        let profile = ConnectionProfile {
            endpoint: Some("mock://engine".to_string()),
            ..Default::default()
        };
        let config = profile.build().unwrap();

        assert_eq!(config.endpoint(), "mock://engine");
        assert_eq!(config.staging_location(), "");
        assert_eq!(config.credential_provider(), "env");
        assert_eq!(config.credential_args(), "");
        assert_eq!(config.log_path(), None);
    }

    #[test]
    fn test_build_requires_endpoint() {
        let err = ConnectionProfile::default().build().unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
        assert!(err.to_string().contains("Endpoint is required"));
    }

    #[test]
    fn test_build_rejects_invalid_endpoint() {
        let profile = ConnectionProfile {
            endpoint: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(profile.build().is_err());
    }

    #[test]
    fn test_connection_merge() {
        let mut base = ConnectionProfile {
            endpoint: Some("mock://engine".to_string()),
            staging_location: Some("mock://bucket/a".to_string()),
            credential_provider: Some("env".to_string()),
            credential_args: None,
            log_path: None,
        };

        let override_profile = ConnectionProfile {
            endpoint: None,
            staging_location: Some("mock://bucket/b".to_string()),
            credential_provider: None,
            credential_args: Some("DBPROBE".to_string()),
            log_path: Some(PathBuf::from("probe.log")),
        };

        base.merge(&override_profile);

        assert_eq!(base.endpoint.as_deref(), Some("mock://engine"));
        assert_eq!(base.staging_location.as_deref(), Some("mock://bucket/b"));
        assert_eq!(base.credential_provider.as_deref(), Some("env"));
        assert_eq!(base.credential_args.as_deref(), Some("DBPROBE"));
        assert_eq!(base.log_path, Some(PathBuf::from("probe.log")));
    }

    #[test]
    fn test_apply_env_defaults_does_not_override() {
        std::env::set_var("DBPROBE_STAGING_LOCATION", "mock://bucket/env");
        let mut profile = ConnectionProfile {
            staging_location: Some("mock://bucket/explicit".to_string()),
            ..Default::default()
        };
        profile.apply_env_defaults();
        assert_eq!(
            profile.staging_location.as_deref(),
            Some("mock://bucket/explicit")
        );
        std::env::remove_var("DBPROBE_STAGING_LOCATION");
    }

    #[test]
    fn test_config_builders() {
        let config = ConnectionConfig::new("mock://engine", "mock://bucket/path")
            .with_credentials("static", "AKIA:secret")
            .with_log_path("probe.log");

        assert_eq!(config.credential_provider(), "static");
        assert_eq!(config.credential_args(), "AKIA:secret");
        assert_eq!(config.log_path(), Some(Path::new("probe.log")));
        assert_eq!(
            config.display_string(),
            "mock://engine (staging: mock://bucket/path)"
        );
    }

    #[test]
    fn test_get_connection() {
        let toml = r#"
[connections.default]
endpoint = "mock://default"

[connections.prod]
endpoint = "mock://prod"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let default = config.get_connection(None).unwrap();
        assert_eq!(default.endpoint.as_deref(), Some("mock://default"));

        let prod = config.get_connection(Some("prod")).unwrap();
        assert_eq!(prod.endpoint.as_deref(), Some("mock://prod"));

        assert!(config.get_connection(Some("nonexistent")).is_none());
    }
}
