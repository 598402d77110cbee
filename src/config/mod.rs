//! Layered configuration for notify-dispatch
//!
//! Priority, lowest to highest:
//! 1. `default.toml`
//! 2. `{environment}.toml` selected by `NOTIFY_APP_ENV`
//! 3. `local.toml` (not committed)
//! 4. `NOTIFY_*` environment variables, `__` separating nested keys
//!
//! `NOTIFY_CONFIG_FILE` replaces the three files with a single one.

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    ApplicationConfig, ConsoleSettings, DatabaseConfig, FileSettings, LoggerSettings,
    MetricsConfig, ProvidersConfig, RetentionConfig, SecurityConfig, ServerConfig, SesConfig,
    Settings, SinchConfig, TasksConfig,
};
