//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::models::NotificationType;

/// Notification dispatch service: provider selection, delivery, callbacks
/// and retention.
#[derive(Parser, Debug)]
#[command(name = "notify-dispatch")]
#[command(about = "Notification dispatch service for SMS and email providers")]
#[command(long_about = "
notify-dispatch sends SMS and email notifications through configured providers,
reconciles their delivery callbacks and keeps inbound keyword messages within
their retention window.

EXAMPLES:
    # Start the API server, task workers and retention schedule
    notify-dispatch serve

    # Bind to every interface on a custom port
    notify-dispatch serve --host 0.0.0.0 --port 8080

    # Check configuration without starting anything
    notify-dispatch --env production serve --dry-run

    # Apply pending database migrations
    notify-dispatch migrate

    # Run one inbound keyword retention pass
    notify-dispatch sweep

    # Make a short number available and bind it to a service
    notify-dispatch shortnumber add 45678
    notify-dispatch shortnumber allocate <SERVICE_ID> <SHORT_NUMBER_ID>

    # Prefer SES for email
    notify-dispatch provider set ses --priority 20
")]
#[command(version = crate::build::CLAP_LONG_VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Single configuration file, replacing the layered config directory
    ///
    /// Example: --config /etc/notify-dispatch/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Selects the `{environment}.toml` overlay instead of NOTIFY_APP_ENV
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Error-level logging only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API, task workers and the retention schedule (default)
    ///
    /// Examples:
    ///   notify-dispatch serve
    ///   notify-dispatch serve --host 0.0.0.0 --port 80
    ///   notify-dispatch serve --dry-run
    Serve {
        /// Interface to bind, e.g. 127.0.0.1 or 0.0.0.0
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// TCP port, 1-65535
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Overrides the configured level and --verbose/--quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Database schema migrations
    ///
    /// Examples:
    ///   notify-dispatch migrate
    ///   notify-dispatch migrate --dry-run
    ///   notify-dispatch migrate --rollback 1
    Migrate {
        /// List pending migrations without applying them
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Revert the most recent STEPS migrations (1-100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
    /// Delete inbound keyword messages past their retention window, once
    Sweep,
    /// Manage inbound short numbers
    #[command(name = "shortnumber")]
    ShortNumber {
        #[command(subcommand)]
        action: ShortNumberCommand,
    },
    /// Inspect and reprioritize providers
    Provider {
        #[command(subcommand)]
        action: ProviderCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShortNumberCommand {
    /// Register a new, unassigned short number
    Add {
        /// 1-11 alphanumeric characters
        #[arg(value_parser = super::validation::validate_short_number)]
        short_number: String,
    },
    /// List short numbers
    List {
        /// Only active numbers not bound to a service
        #[arg(long)]
        available: bool,
    },
    /// Bind an available short number to a service
    Allocate {
        service_id: Uuid,
        short_number_id: Uuid,
    },
    /// Stop routing inbound messages for a service's short number
    Deactivate {
        service_id: Uuid,

        /// Re-enable a previously deactivated number instead
        #[arg(long)]
        reactivate: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProviderCommand {
    /// List providers, highest priority first
    List {
        #[arg(long, value_enum)]
        channel: Option<Channel>,
    },
    /// Change a provider's priority or active flag
    Set {
        identifier: String,

        #[arg(long)]
        priority: Option<i32>,

        #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
        active: Option<bool>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Sms,
    Email,
}

impl Cli {
    /// Checks argument combinations clap cannot express.
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Some(Commands::Migrate { dry_run, rollback }) if *dry_run && rollback.is_some() => {
                Err("Cannot use --dry-run and --rollback together".to_string())
            }
            Some(Commands::Provider {
                action:
                    ProviderCommand::Set {
                        priority: None,
                        active: None,
                        ..
                    },
            }) => Err("provider set needs --priority or --active".to_string()),
            _ if self.verbose && self.quiet => {
                Err("Cannot use --verbose and --quiet together".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

impl From<Channel> for NotificationType {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Sms => NotificationType::Sms,
            Channel::Email => NotificationType::Email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["notify-dispatch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["notify-dispatch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from([
            "notify-dispatch",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--log-level",
            "debug",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                log_level,
                dry_run,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert_eq!(log_level, Some(LogLevel::Debug));
                assert!(!dry_run);
            }
            other => panic!("Expected Serve command, got {other:?}"),
        }
    }

    #[test]
    fn test_migrate_dry_run_conflicts_with_rollback() {
        let err = Cli::try_parse_from(["notify-dispatch", "migrate", "--dry-run", "--rollback", "2"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_sweep_command() {
        let cli = Cli::try_parse_from(["notify-dispatch", "--env", "prod", "sweep"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Sweep)));
        assert_eq!(cli.env, Some(Environment::Production));
    }

    #[test]
    fn test_shortnumber_subcommands() {
        let service_id = Uuid::new_v4();
        let number_id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "notify-dispatch",
            "shortnumber",
            "allocate",
            &service_id.to_string(),
            &number_id.to_string(),
        ])
        .unwrap();
        match cli.command {
            Some(Commands::ShortNumber { action }) => assert_eq!(
                action,
                ShortNumberCommand::Allocate {
                    service_id,
                    short_number_id: number_id
                }
            ),
            other => panic!("Expected shortnumber command, got {other:?}"),
        }

        let cli =
            Cli::try_parse_from(["notify-dispatch", "shortnumber", "list", "--available"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::ShortNumber {
                action: ShortNumberCommand::List { available: true }
            })
        ));

        assert!(Cli::try_parse_from(["notify-dispatch", "shortnumber", "add", "not valid!"]).is_err());
        assert!(Cli::try_parse_from(["notify-dispatch", "shortnumber", "allocate", "x", "y"]).is_err());
    }

    #[test]
    fn test_provider_set_parses_explicit_bool() {
        let cli = Cli::try_parse_from([
            "notify-dispatch",
            "provider",
            "set",
            "sinch",
            "--active",
            "false",
        ])
        .unwrap();
        assert!(cli.validate().is_ok());
        match cli.command {
            Some(Commands::Provider {
                action:
                    ProviderCommand::Set {
                        identifier,
                        priority,
                        active,
                    },
            }) => {
                assert_eq!(identifier, "sinch");
                assert_eq!(priority, None);
                assert_eq!(active, Some(false));
            }
            other => panic!("Expected provider set, got {other:?}"),
        }
    }

    #[test]
    fn test_provider_set_without_changes_is_invalid() {
        let cli = Cli::try_parse_from(["notify-dispatch", "provider", "set", "ses"]).unwrap();
        assert!(cli.validate().unwrap_err().contains("--priority"));
    }

    #[test]
    fn test_provider_list_channel() {
        let cli =
            Cli::try_parse_from(["notify-dispatch", "provider", "list", "--channel", "email"]).unwrap();
        match cli.command {
            Some(Commands::Provider {
                action: ProviderCommand::List { channel },
            }) => assert_eq!(channel.map(NotificationType::from), Some(NotificationType::Email)),
            other => panic!("Expected provider list, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["notify-dispatch", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
