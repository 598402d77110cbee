//! Configuration validation logic
//!
//! Every section checks its own values and reports the first offending field.

use cron::Schedule;

use crate::config::error::ConfigError;
use crate::config::settings::{
    DatabaseConfig, FileSettings, LoggerSettings, ProvidersConfig, RetentionConfig,
    SecurityConfig, ServerConfig, SesConfig, Settings, SinchConfig, TasksConfig,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Upper bound on `tasks.max_retries`.
pub const MAX_TASK_RETRIES: u32 = 20;

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        if self.keep_alive_timeout == 0 {
            return Err(ConfigError::validation(
                "server.keep_alive_timeout",
                "Keep-alive timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// URL must be a postgres URL; pool bounds must be positive and ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()
    }
}

impl TasksConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::validation(
                "tasks.worker_count",
                "At least one worker is required.",
            ));
        }

        if self.task_timeout == 0 {
            return Err(ConfigError::validation(
                "tasks.task_timeout",
                "Task timeout must be greater than 0 seconds.",
            ));
        }

        if self.max_retries > MAX_TASK_RETRIES {
            return Err(ConfigError::ValidationError {
                field: "tasks.max_retries".to_string(),
                message: format!("At most {MAX_TASK_RETRIES} retries are allowed."),
            });
        }

        if !self.retry_backoff_multiplier.is_finite() || self.retry_backoff_multiplier < 1.0 {
            return Err(ConfigError::validation(
                "tasks.retry_backoff_multiplier",
                "Backoff multiplier must be a finite number of at least 1.0.",
            ));
        }

        if let Err(e) = self.retention_sweep_cron.parse::<Schedule>() {
            return Err(ConfigError::ValidationError {
                field: "tasks.retention_sweep_cron".to_string(),
                message: format!(
                    "Invalid cron expression '{}': {}",
                    self.retention_sweep_cron, e
                ),
            });
        }

        Ok(())
    }
}

impl SesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::validation("providers.ses.region", "Region is required."));
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(ConfigError::validation(
                "providers.ses.access_key_id",
                "Access key id and secret access key are required.",
            ));
        }
        if self.sending_domain.trim().is_empty() || self.sending_domain.contains('@') {
            return Err(ConfigError::validation(
                "providers.ses.sending_domain",
                "Sending domain must be a bare domain name.",
            ));
        }
        if let Some(endpoint) = &self.endpoint
            && url::Url::parse(endpoint).is_err()
        {
            return Err(ConfigError::validation(
                "providers.ses.endpoint",
                "Endpoint must be an absolute URL.",
            ));
        }
        Ok(())
    }
}

impl SinchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_plan_id.is_empty() || self.api_token.is_empty() {
            return Err(ConfigError::validation(
                "providers.sinch.service_plan_id",
                "Service plan id and API token are required.",
            ));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::validation(
                "providers.sinch.base_url",
                "Base URL must be an absolute URL.",
            ));
        }
        if self.default_region.len() != 2 {
            return Err(ConfigError::validation(
                "providers.sinch.default_region",
                "Default region must be a two-letter country code.",
            ));
        }
        Ok(())
    }
}

impl ProvidersConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "providers.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }
        if let Some(host) = &self.callback_host
            && url::Url::parse(host).is_err()
        {
            return Err(ConfigError::validation(
                "providers.callback_host",
                "Callback host must be an absolute URL.",
            ));
        }
        if let Some(ses) = &self.ses {
            ses.validate()?;
        }
        if let Some(sinch) = &self.sinch {
            sinch.validate()?;
        }
        Ok(())
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_days == 0 {
            return Err(ConfigError::validation(
                "retention.default_days",
                "Default retention must be at least one day.",
            ));
        }
        if self.batch_size <= 0 {
            return Err(ConfigError::validation(
                "retention.batch_size",
                "Batch size must be greater than 0.",
            ));
        }
        self.parsed_timezone().map(|_| ())
    }
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encryption_key.len() != 64
            || !self.encryption_key.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ConfigError::validation(
                "security.encryption_key",
                "Encryption key must be 64 hex characters (32 bytes).",
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logger.validate()?;
        self.tasks.validate()?;
        self.providers.validate()?;
        self.validate_task_timeout()?;
        self.retention.validate()?;
        self.security.validate()?;
        Ok(())
    }

    /// A delivery attempt must outlive its provider request, otherwise the
    /// task is cut off after the provider may already have accepted it.
    fn validate_task_timeout(&self) -> Result<(), ConfigError> {
        let provider_budget = self
            .providers
            .request_timeout
            .saturating_add(self.providers.connect_timeout);
        if self.tasks.task_timeout <= provider_budget {
            return Err(ConfigError::ValidationError {
                field: "tasks.task_timeout".to_string(),
                message: format!(
                    "Task timeout ({}s) must exceed providers.request_timeout plus providers.connect_timeout ({}s).",
                    self.tasks.task_timeout, provider_budget
                ),
            });
        }
        Ok(())
    }
}
