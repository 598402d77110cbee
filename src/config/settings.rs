//! Configuration settings structures for notify-dispatch
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "notify-dispatch".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6011
}

fn default_request_timeout() -> u64 {
    30
}

fn default_keep_alive_timeout() -> u64 {
    75
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/notify-dispatch.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_worker_count() -> usize {
    4
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    10
}

fn default_retry_backoff() -> f64 {
    2.0
}

fn default_task_timeout() -> u64 {
    120
}

fn default_retention_sweep_cron() -> String {
    // sec min hour day month weekday
    "0 0 4 * * *".to_string()
}

fn default_provider_request_timeout() -> u64 {
    30
}

fn default_provider_connect_timeout() -> u64 {
    10
}

fn default_ses_region() -> String {
    "ca-central-1".to_string()
}

fn default_sinch_base_url() -> String {
    "https://us.sms.api.sinch.com".to_string()
}

fn default_sinch_region() -> String {
    "US".to_string()
}

fn default_retention_days() -> u64 {
    7
}

fn default_retention_batch_size() -> i64 {
    10_000
}

fn default_timezone() -> String {
    "America/Toronto".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keep_alive_timeout")]
    pub keep_alive_timeout: u64,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            keep_alive_timeout: default_keep_alive_timeout(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether to automatically run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// "trace", "debug", "info", "warn" or "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Converts the file representation into the runtime logger config.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level).map_err(|e| ConfigError::ValidationError {
            field: "logger".to_string(),
            message: e.to_string(),
        })
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger.file".to_string(),
                message: e.to_string(),
            }
        })
    }
}

// ============================================================================
// Tasks Configuration
// ============================================================================

/// Background task execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Whether workers and the scheduler run inside `serve`
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_multiplier: f64,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_task_timeout")]
    pub task_timeout: u64,

    /// Six-field cron expression for the keyword retention sweep
    #[serde(default = "default_retention_sweep_cron")]
    pub retention_sweep_cron: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            worker_count: default_worker_count(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            retry_backoff_multiplier: default_retry_backoff(),
            task_timeout: default_task_timeout(),
            retention_sweep_cron: default_retention_sweep_cron(),
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Amazon SES credentials and identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SesConfig {
    #[serde(default = "default_ses_region")]
    pub region: String,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    #[serde(default)]
    pub session_token: Option<String>,

    /// Account owning the sending identity; enables the SES ARN headers
    #[serde(default)]
    pub owner_account: Option<String>,

    pub sending_domain: String,

    /// Override of `https://email.{region}.amazonaws.com/`
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Sinch SMS REST credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinchConfig {
    pub service_plan_id: String,

    pub api_token: String,

    #[serde(default = "default_sinch_base_url")]
    pub base_url: String,

    /// Region used when a recipient has no country code
    #[serde(default = "default_sinch_region")]
    pub default_region: String,

    #[serde(default)]
    pub default_sender: Option<String>,
}

/// Outbound provider settings. A missing section means no client is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Public base URL for delivery-report callbacks
    #[serde(default)]
    pub callback_host: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_provider_request_timeout")]
    pub request_timeout: u64,

    /// HTTP connect timeout in seconds
    #[serde(default = "default_provider_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default)]
    pub ses: Option<SesConfig>,

    #[serde(default)]
    pub sinch: Option<SinchConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            callback_host: None,
            request_timeout: default_provider_request_timeout(),
            connect_timeout: default_provider_connect_timeout(),
            ses: None,
            sinch: None,
        }
    }
}

// ============================================================================
// Retention Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Window for services without a custom sms retention
    #[serde(default = "default_retention_days")]
    pub default_days: u64,

    #[serde(default = "default_retention_batch_size")]
    pub batch_size: i64,

    /// IANA zone whose midnight bounds retention and daily limits
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl RetentionConfig {
    pub fn parsed_timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone.parse().map_err(|_| {
            ConfigError::validation(
                "retention.timezone",
                format!("Unknown timezone '{}'.", self.timezone),
            )
        })
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            default_days: default_retention_days(),
            batch_size: default_retention_batch_size(),
            timezone: default_timezone(),
        }
    }
}

// ============================================================================
// Security & Metrics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// 64 hex characters (AES-256) protecting queued payloads
    #[serde(default)]
    pub encryption_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and expose `/metrics`
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub tasks: TasksConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}
