//! Configuration loading and validation

use crate::engine::FailoverSettings;
use crate::matcher::{CidrMatcher, PrefixMatcher, SubnetMatcher};
use common::{LogFormat, LogLevel, LoggingOptions};
use hcloud::LabelSelector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Where the CLI looks when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hetzner-vrrp/config.yaml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML in config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Config file is empty")]
    Empty,

    #[error("Required field '{0}' missing in config")]
    MissingField(&'static str),

    #[error("Invalid log_level '{0}'. Must be one of: {names}", names = LogLevel::NAMES.join(", "))]
    InvalidLogLevel(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// How alias addresses are assigned to private networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetMatching {
    /// Compare against the server's own address on each network
    #[default]
    Prefix,
    /// Use the subnet ranges of the attached networks
    Cidr,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hetzner_api_token: Option<String>,

    #[serde(default)]
    pub floating_ip_labels: LabelSelector,

    #[serde(default)]
    pub alias_ips: Vec<String>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub subnet_matching: SubnetMatching,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub metadata: MetadataSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.api.validate()?;
        self.metadata.validate()?;
        Ok(())
    }
}

/// Cloud API client settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApiSettings {
    #[validate(url)]
    pub endpoint: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_api_timeout")]
    pub timeout: Duration,
}

/// Instance metadata client settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetadataSettings {
    #[validate(url)]
    pub endpoint: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_metadata_timeout")]
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: hcloud::client::DEFAULT_ENDPOINT.to_string(),
            timeout: hcloud::client::DEFAULT_TIMEOUT,
        }
    }
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            endpoint: hcloud::metadata::DEFAULT_METADATA_URL.to_string(),
            timeout: hcloud::metadata::DEFAULT_METADATA_TIMEOUT,
        }
    }
}

// Custom validators

fn validate_api_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let secs = timeout.as_secs_f64();
    if !(1.0..=300.0).contains(&secs) {
        return Err(ValidationError::new("api_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_metadata_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if !(100..=60_000).contains(&millis) {
        return Err(ValidationError::new("metadata_timeout_out_of_range"));
    }
    Ok(())
}

/// Redacted view of a [`Config`], safe to log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub floating_ip_labels: LabelSelector,
    pub alias_ips: Vec<String>,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub subnet_matching: SubnetMatching,
    pub api_endpoint: String,
    pub metadata_endpoint: String,
    pub has_api_token: bool,
}

impl Config {
    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Err(ConfigError::Empty);
        }

        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        if value.is_null() {
            return Err(ConfigError::Empty);
        }

        let config: Config = serde_yaml::from_value(value)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.api_token().is_empty() {
            return Err(ConfigError::MissingField("hetzner_api_token"));
        }

        if let Some(level) = &self.log_level {
            level
                .parse::<LogLevel>()
                .map_err(|_| ConfigError::InvalidLogLevel(level.clone()))?;
        }

        self.validate()?;
        Ok(())
    }

    pub fn api_token(&self) -> &str {
        self.hetzner_api_token.as_deref().unwrap_or_default().trim()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or_default()
    }

    pub fn logging_options(&self) -> LoggingOptions {
        LoggingOptions {
            level: self.log_level(),
            format: self.log_format,
            file: self.log_file.clone(),
        }
    }

    pub fn failover_settings(&self, dry_run: bool) -> FailoverSettings {
        FailoverSettings {
            floating_ip_labels: self.floating_ip_labels.clone(),
            alias_ips: self.alias_ips.clone(),
            dry_run,
        }
    }

    /// Matcher selected by `subnet_matching`
    pub fn matcher(&self) -> Box<dyn SubnetMatcher> {
        match self.subnet_matching {
            SubnetMatching::Prefix => Box::new(PrefixMatcher),
            SubnetMatching::Cidr => Box::new(CidrMatcher),
        }
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            floating_ip_labels: self.floating_ip_labels.clone(),
            alias_ips: self.alias_ips.clone(),
            log_file: self.log_file.clone(),
            log_level: self.log_level().to_string(),
            log_format: self.log_format,
            subnet_matching: self.subnet_matching,
            api_endpoint: self.api.endpoint.clone(),
            metadata_endpoint: self.metadata.endpoint.clone(),
            has_api_token: !self.api_token().is_empty(),
        }
    }
}
