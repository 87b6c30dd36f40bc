//! Configuration management for payload-mcp
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Environment variables keep the `PAYLOAD_MCP_` prefix with `__` as the
//! nesting delimiter, e.g. `PAYLOAD_MCP_PAYLOAD__BASE_URL`.

use crate::error::{Result, PayloadMcpError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for payload-mcp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Payload CMS connection settings
    #[serde(default)]
    pub payload: PayloadConfig,
}

/// Payload CMS connection configuration
///
/// These values are handed to the client and the login flow at
/// construction and never change afterwards.
#[derive(Clone, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// Base URL of the Payload REST API, including the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Statically configured JWT; when absent the first call triggers a login
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Whether TLS certificates are verified
    #[serde(default)]
    pub verify_ssl: bool,
    /// Whether system proxies are bypassed for backend requests
    #[serde(default = "default_true")]
    pub bypass_proxy: bool,
    /// Interactive login settings
    #[serde(default)]
    pub login: LoginConfig,
}

/// Interactive browser login configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Collection whose `/login` endpoint is used by default
    #[serde(default = "default_login_collection")]
    pub collection: String,
    /// Upper bound on a single login attempt, in seconds
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
    /// Local port for the callback listener; 0 picks an ephemeral port
    #[serde(default)]
    pub callback_port: u16,
    /// Whether to launch the system browser at the login form
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_login_collection() -> String {
    "users".to_string()
}

fn default_deadline_seconds() -> u64 {
    300
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_seconds: default_timeout_seconds(),
            verify_ssl: false,
            bypass_proxy: true,
            login: LoginConfig::default(),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            collection: default_login_collection(),
            deadline_seconds: default_deadline_seconds(),
            callback_port: 0,
            open_browser: true,
        }
    }
}

// Token is redacted
impl std::fmt::Debug for PayloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("verify_ssl", &self.verify_ssl)
            .field("bypass_proxy", &self.bypass_proxy)
            .field("login", &self.login)
            .finish()
    }
}

impl PayloadConfig {
    /// Returns the static token, treating an empty string as absent
    pub fn static_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Base URL without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PayloadMcpError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PayloadMcpError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(level) = std::env::var("PAYLOAD_MCP_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Ok(base_url) = std::env::var("PAYLOAD_MCP_PAYLOAD__BASE_URL") {
            self.payload.base_url = base_url;
        }

        if let Ok(token) = std::env::var("PAYLOAD_MCP_PAYLOAD__AUTH_TOKEN") {
            self.payload.auth_token = Some(token);
        }

        if let Ok(timeout) = std::env::var("PAYLOAD_MCP_PAYLOAD__TIMEOUT") {
            if let Ok(v) = timeout.parse() {
                self.payload.timeout_seconds = v;
            } else {
                tracing::warn!("Invalid PAYLOAD_MCP_PAYLOAD__TIMEOUT: {}", timeout);
            }
        }

        if let Some(v) = env_bool("PAYLOAD_MCP_PAYLOAD__VERIFY_SSL") {
            self.payload.verify_ssl = v;
        }

        if let Some(v) = env_bool("PAYLOAD_MCP_PAYLOAD__BYPASS_PROXY") {
            self.payload.bypass_proxy = v;
        }

        if let Ok(collection) = std::env::var("PAYLOAD_MCP_LOGIN__COLLECTION") {
            tracing::debug!(collection = %collection, "Env override: PAYLOAD_MCP_LOGIN__COLLECTION");
            self.payload.login.collection = collection;
        }

        if let Ok(deadline) = std::env::var("PAYLOAD_MCP_LOGIN__DEADLINE_SECONDS") {
            if let Ok(v) = deadline.parse() {
                self.payload.login.deadline_seconds = v;
            } else {
                tracing::warn!("Invalid PAYLOAD_MCP_LOGIN__DEADLINE_SECONDS: {}", deadline);
            }
        }

        if let Ok(port) = std::env::var("PAYLOAD_MCP_LOGIN__CALLBACK_PORT") {
            if let Ok(v) = port.parse() {
                self.payload.login.callback_port = v;
            } else {
                tracing::warn!("Invalid PAYLOAD_MCP_LOGIN__CALLBACK_PORT: {}", port);
            }
        }

        if let Some(v) = env_bool("PAYLOAD_MCP_LOGIN__OPEN_BROWSER") {
            self.payload.login.open_browser = v;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
            self.log_level = "debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(PayloadMcpError::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ))
            .into());
        }

        let url = url::Url::parse(&self.payload.base_url).map_err(|e| {
            PayloadMcpError::Config(format!(
                "Invalid base_url '{}': {}",
                self.payload.base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PayloadMcpError::Config(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            ))
            .into());
        }

        if self.payload.timeout_seconds == 0 {
            return Err(
                PayloadMcpError::Config("timeout_seconds must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.payload.login.deadline_seconds == 0 {
            return Err(PayloadMcpError::Config(
                "login.deadline_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.payload.login.collection.trim().is_empty() {
            return Err(
                PayloadMcpError::Config("login.collection cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            payload: PayloadConfig::default(),
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => {
            tracing::warn!("Invalid value for {}: {}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "PAYLOAD_MCP_LOG_LEVEL",
        "PAYLOAD_MCP_PAYLOAD__BASE_URL",
        "PAYLOAD_MCP_PAYLOAD__AUTH_TOKEN",
        "PAYLOAD_MCP_PAYLOAD__TIMEOUT",
        "PAYLOAD_MCP_PAYLOAD__VERIFY_SSL",
        "PAYLOAD_MCP_PAYLOAD__BYPASS_PROXY",
        "PAYLOAD_MCP_LOGIN__COLLECTION",
        "PAYLOAD_MCP_LOGIN__DEADLINE_SECONDS",
        "PAYLOAD_MCP_LOGIN__CALLBACK_PORT",
        "PAYLOAD_MCP_LOGIN__OPEN_BROWSER",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.payload.base_url, "http://localhost:3000/api");
        assert_eq!(config.payload.timeout_seconds, 30);
        assert!(!config.payload.verify_ssl);
        assert!(config.payload.bypass_proxy);
        assert_eq!(config.payload.login.collection, "users");
        assert_eq!(config.payload.login.deadline_seconds, 300);
        assert_eq!(config.payload.login.callback_port, 0);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let mut config = Config::default();
        config.payload.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.payload.base_url = "ftp://example.com/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_timeout() {
        let mut config = Config::default();
        config.payload.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_deadline() {
        let mut config = Config::default();
        config.payload.login.deadline_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_static_token_treats_blank_as_absent() {
        let mut payload = PayloadConfig::default();
        assert!(payload.static_token().is_none());
        payload.auth_token = Some("   ".to_string());
        assert!(payload.static_token().is_none());
        payload.auth_token = Some("abc".to_string());
        assert_eq!(payload.static_token(), Some("abc"));
    }

    #[test]
    fn test_api_root_strips_trailing_slash() {
        let payload = PayloadConfig {
            base_url: "https://cms.example.com/api/".to_string(),
            ..PayloadConfig::default()
        };
        assert_eq!(payload.api_root(), "https://cms.example.com/api");
    }

    #[test]
    fn test_debug_redacts_token() {
        let payload = PayloadConfig {
            auth_token: Some("super-secret-jwt".to_string()),
            ..PayloadConfig::default()
        };
        let debug = format!("{:?}", payload);
        assert!(!debug.contains("super-secret-jwt"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_yaml_with_partial_sections() {
        let yaml = r#"
payload:
  base_url: https://cms.example.com/api
  login:
    collection: admins
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.payload.base_url, "https://cms.example.com/api");
        assert_eq!(config.payload.timeout_seconds, 30);
        assert_eq!(config.payload.login.collection, "admins");
        assert_eq!(config.payload.login.deadline_seconds, 300);
    }

    #[test]
    fn test_from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_level: debug\npayload:\n  timeout_seconds: 5\n").unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.payload.timeout_seconds, 5);
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply() {
        clear_env();
        std::env::set_var("PAYLOAD_MCP_PAYLOAD__BASE_URL", "https://cms.example.com/api");
        std::env::set_var("PAYLOAD_MCP_PAYLOAD__AUTH_TOKEN", "env-token");
        std::env::set_var("PAYLOAD_MCP_PAYLOAD__TIMEOUT", "12");
        std::env::set_var("PAYLOAD_MCP_PAYLOAD__VERIFY_SSL", "true");
        std::env::set_var("PAYLOAD_MCP_LOGIN__COLLECTION", "admins");
        std::env::set_var("PAYLOAD_MCP_LOGIN__DEADLINE_SECONDS", "45");
        std::env::set_var("PAYLOAD_MCP_LOGIN__OPEN_BROWSER", "false");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.payload.base_url, "https://cms.example.com/api");
        assert_eq!(config.payload.static_token(), Some("env-token"));
        assert_eq!(config.payload.timeout_seconds, 12);
        assert!(config.payload.verify_ssl);
        assert_eq!(config.payload.login.collection, "admins");
        assert_eq!(config.payload.login.deadline_seconds, 45);
        assert!(!config.payload.login.open_browser);
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clear_env();
        std::env::set_var("PAYLOAD_MCP_PAYLOAD__TIMEOUT", "soon");
        std::env::set_var("PAYLOAD_MCP_PAYLOAD__BYPASS_PROXY", "maybe");
        std::env::set_var("PAYLOAD_MCP_LOGIN__CALLBACK_PORT", "99999");

        let mut config = Config::default();
        config.apply_env_vars();
        clear_env();

        assert_eq!(config.payload.timeout_seconds, 30);
        assert!(config.payload.bypass_proxy);
        assert_eq!(config.payload.login.callback_port, 0);
    }
}
