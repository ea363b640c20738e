//! Configuration loading and validation for the uptime server

use crate::types::{Domain, ServerConfig};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uptime::{DEFAULT_HISTORY_SIZE, EndpointSpec};
use validator::{Validate, ValidationError, ValidationErrors};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "UPTIME_CONFIG";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.server.validate()?;
        self.storage.validate()?;
        self.scheduler.validate()?;

        let mut seen = HashSet::new();
        for domain in &self.domains {
            domain.validate()?;
            if !seen.insert(domain.domain.as_str()) {
                let mut error = ValidationError::new("duplicate_domain");
                error.add_param(Cow::from("domain"), &domain.domain);
                let mut errors = ValidationErrors::new();
                errors.add("domains", error);
                return Err(errors);
            }
        }
        Ok(())
    }
}

/// Query API settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,

    /// Bound on graceful HTTP shutdown
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_shutdown_timeout")]
    pub shutdown_timeout: Duration,
}

/// History store settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageSettings {
    #[validate(length(min = 1))]
    pub path: String,

    #[validate(range(min = 1, max = 10000))]
    pub history_size: usize,
}

/// Sweep settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SchedulerSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_interval")]
    pub interval: Duration,

    /// How long stop waits for in-flight probes before cancelling them
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_drain_timeout")]
    pub drain_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: LogFormat,
}

/// A named group of endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DomainConfig {
    #[validate(length(min = 1))]
    pub domain: String,

    #[validate(length(min = 1), custom = "validate_endpoints")]
    pub endpoints: Vec<EndpointSpec>,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "endpoints.db".to_string(),
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Custom validators

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    let Some((host, port)) = addr.trim().rsplit_once(':') else {
        return Err(ValidationError::new("listen_addr_missing_port"));
    };
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(ValidationError::new("listen_addr_invalid_format"));
    }
    Ok(())
}

fn validate_shutdown_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    if timeout.is_zero() || *timeout > Duration::from_secs(300) {
        return Err(ValidationError::new("shutdown_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_interval(interval: &Duration) -> Result<(), ValidationError> {
    let secs = interval.as_secs();
    if secs < 1 || secs > 86_400 {
        return Err(ValidationError::new("interval_out_of_range"));
    }
    Ok(())
}

fn validate_drain_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    if *timeout > Duration::from_secs(600) {
        return Err(ValidationError::new("drain_timeout_out_of_range"));
    }
    Ok(())
}

const MAX_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(86_400);

fn validate_endpoints(endpoints: &[EndpointSpec]) -> Result<(), ValidationError> {
    for spec in endpoints {
        let valid_url = reqwest::Url::parse(&spec.url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);

        let code = if !valid_url {
            "endpoint_url_invalid"
        } else if spec.timeout.is_zero() || spec.timeout > MAX_ENDPOINT_TIMEOUT {
            "endpoint_timeout_out_of_range"
        } else if !(100..=599).contains(&spec.expected_status) {
            "endpoint_status_out_of_range"
        } else {
            continue;
        };

        let mut error = ValidationError::new(code);
        error.add_param(Cow::from("url"), &spec.url);
        return Err(error);
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from `$UPTIME_CONFIG` or the default search paths
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path));
            }
            tracing::info!("Loading configuration from: {}", path.display());
            return Self::load_from_file(&path);
        }

        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/uptime/uptime-server.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./uptime-server.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/uptime/uptime-server.yaml"))
    }

    /// Convert to the runtime server configuration
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.server.listen_addr.clone(),
            shutdown_timeout: self.server.shutdown_timeout,
            db_path: PathBuf::from(&self.storage.path),
            history_size: self.storage.history_size,
            interval: self.scheduler.interval,
            drain_timeout: self.scheduler.drain_timeout,
            metrics_enabled: self.metrics.enabled,
            domains: self
                .domains
                .iter()
                .map(|d| Domain {
                    name: d.domain.clone(),
                    endpoints: d.endpoints.clone(),
                })
                .collect(),
        }
    }
}
