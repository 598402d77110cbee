//! Command-line interface: parsing, configuration merging and command
//! handlers.

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Channel, Cli, Commands, Environment, LogLevel, ProviderCommand, ShortNumberCommand};

use crate::config::{ConfigError, Settings};
use crate::logger::init_logger;

/// Loads files and environment, applies CLI overrides, then validates.
pub fn load_and_merge_config(cli: &Cli) -> Result<Settings, ConfigError> {
    ConfigurationMerger::load(cli)?.merge_cli_args(cli)
}

pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings.logger.clone().into_logger_config()?;
    init_logger(logger_config)?;
    Ok(())
}
