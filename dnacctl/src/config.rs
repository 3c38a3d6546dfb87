//! CLI configuration management
//!
//! Handles locating, loading, and saving the YAML configuration file, and
//! layering environment variables and command-line flags on top of it.

use anyhow::{Context, Result};
use dnac_core::ClientOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "DNAC_CONFIG_FILE";

const CONFIG_FILE_NAME: &str = "config.yaml";
const MAX_TIMEOUT_SECS: u64 = 300;

/// Controller connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Controller address, with or without scheme
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub verify_ssl: bool,
    /// Per-request timeout in seconds
    pub timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            verify_ssl: true,
            timeout: dnac_core::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Login credentials
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,

    /// Default output format
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            output_format: "table".to_string(),
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Starting point written by `config init`
    pub fn template() -> Self {
        let mut config = Self::default();
        config.server.host = "dnac.example.com".to_string();
        config.auth.username = "admin".to_string();
        config
    }

    /// Find the config file to load.
    ///
    /// Search order: `explicit`, `$DNAC_CONFIG_FILE`, `./config.yaml`, then
    /// `<config dir>/dnac/config.yaml`. An explicit or environment path is
    /// returned even if it doesn't exist, so loading it reports the mistake.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        Self::default_path().ok().filter(|path| path.is_file())
    }

    /// Per-user config file location
    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
        Ok(config_dir.join("dnac").join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to a YAML file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize CLI config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Controller base URL. A bare host gets `https://`.
    pub fn base_url(&self) -> Result<String> {
        let host = self.server.host.trim();
        if host.is_empty() {
            return Err(anyhow::anyhow!(
                "No controller host configured. Set server.host in the config file, \
                 DNAC_HOST, or --host"
            ));
        }

        if host.contains("://") {
            Ok(host.to_string())
        } else {
            Ok(format!("https://{}", host))
        }
    }

    /// Session options derived from the server section
    pub fn client_options(&self) -> ClientOptions {
        let options = ClientOptions::default()
            .with_verify_ssl(self.server.verify_ssl)
            .with_timeout(Duration::from_secs(self.server.timeout));

        match self.server.port {
            Some(port) => options.with_port(port),
            None => options,
        }
    }

    /// Copy safe to print: the password is masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.auth.password.is_empty() {
            config.auth.password = "********".to_string();
        }
        config
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// Apply the layers in that order; each one overrides what came before.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    verify_ssl: Option<bool>,
    timeout: Option<u64>,
    username: Option<String>,
    password: Option<String>,
    output_format: Option<String>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set controller host (with validation)
    pub fn with_host(mut self, host: impl Into<String>) -> Result<Self> {
        let host = host.into();
        Self::validate_host(&host)?;
        self.host = Some(host);
        Ok(self)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = Some(verify_ssl);
        self
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Load the config file found by [`CliConfig::locate`], if any.
    ///
    /// Blank strings in the file leave the current value alone.
    pub fn with_config_file(mut self, explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = CliConfig::locate(explicit) else {
            return Ok(self);
        };
        let file = CliConfig::load_from(&path)?;

        if !file.server.host.trim().is_empty() {
            Self::validate_host(&file.server.host)
                .with_context(|| format!("Invalid server.host in {}", path.display()))?;
            self.host = Some(file.server.host);
        }
        if file.server.port.is_some() {
            self.port = file.server.port;
        }
        Self::validate_timeout(file.server.timeout)
            .with_context(|| format!("Invalid server.timeout in {}", path.display()))?;
        self.timeout = Some(file.server.timeout);
        self.verify_ssl = Some(file.server.verify_ssl);
        if !file.auth.username.is_empty() {
            self.username = Some(file.auth.username);
        }
        if !file.auth.password.is_empty() {
            self.password = Some(file.auth.password);
        }
        Self::validate_output_format(&file.output_format)
            .with_context(|| format!("Invalid output_format in {}", path.display()))?;
        self.output_format = Some(file.output_format);
        self.verbose = Some(file.verbose);

        Ok(self)
    }

    /// Apply environment variable overrides
    ///
    /// Values that fail validation are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("DNAC_HOST") {
            if Self::validate_host(&host).is_ok() {
                self.host = Some(host);
            }
        }

        if let Ok(username) = std::env::var("DNAC_USERNAME") {
            if !username.is_empty() {
                self.username = Some(username);
            }
        }

        if let Ok(password) = std::env::var("DNAC_PASSWORD") {
            if !password.is_empty() {
                self.password = Some(password);
            }
        }

        if let Ok(verify_ssl) = std::env::var("DNAC_VERIFY_SSL") {
            if let Some(verify_ssl) = parse_bool(&verify_ssl) {
                self.verify_ssl = Some(verify_ssl);
            }
        }

        if let Ok(timeout) = std::env::var("DNAC_TIMEOUT") {
            if let Ok(timeout) = timeout.trim().parse() {
                if Self::validate_timeout(timeout).is_ok() {
                    self.timeout = Some(timeout);
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let host = self.host.unwrap_or(defaults.server.host);
        let output_format = self.output_format.unwrap_or(defaults.output_format);
        let timeout = self.timeout.unwrap_or(defaults.server.timeout);

        // Validate final values
        if !host.is_empty() {
            Self::validate_host(&host)?;
        }
        Self::validate_output_format(&output_format)?;
        Self::validate_timeout(timeout)?;

        Ok(CliConfig {
            server: ServerConfig {
                host,
                port: self.port.or(defaults.server.port),
                verify_ssl: self.verify_ssl.unwrap_or(defaults.server.verify_ssl),
                timeout,
            },
            auth: AuthConfig {
                username: self.username.unwrap_or(defaults.auth.username),
                password: self.password.unwrap_or(defaults.auth.password),
            },
            output_format,
            verbose: self.verbose.unwrap_or(defaults.verbose),
        })
    }

    /// Validate host format
    fn validate_host(host: &str) -> Result<()> {
        let host = host.trim();
        if host.is_empty() {
            return Err(anyhow::anyhow!("Controller host cannot be empty"));
        }

        if let Some((scheme, _)) = host.split_once("://") {
            if scheme != "http" && scheme != "https" {
                return Err(anyhow::anyhow!(
                    "Controller URL must start with http:// or https://, got {}://",
                    scheme
                ));
            }
        }

        Ok(())
    }

    /// Validate output format
    fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }

    /// Validate timeout value
    fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }

        if timeout > MAX_TIMEOUT_SECS {
            return Err(anyhow::anyhow!(
                "Timeout must be less than or equal to {} seconds",
                MAX_TIMEOUT_SECS
            ));
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
