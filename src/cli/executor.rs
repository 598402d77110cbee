//! Dispatches a parsed command to its handler.

use super::handlers::{
    MigrateCommandHandler, ProviderCommandHandler, ServeCommandHandler, ShortNumberCommandHandler,
    SweepCommandHandler,
};
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Runs the command; `serve` (also the default) blocks until shutdown.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    validate_command_args(cli)?;

    let mut stdout = std::io::stdout();
    match &cli.command {
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings).execute(*dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
        Some(Commands::Migrate { dry_run, rollback }) => {
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await
        }
        Some(Commands::Sweep) => SweepCommandHandler::from_settings(&settings)
            .await?
            .execute(&mut stdout)
            .await
            .map(|_| ()),
        Some(Commands::ShortNumber { action }) => {
            ShortNumberCommandHandler::from_settings(&settings)
                .await?
                .execute(action, &mut stdout)
                .await
        }
        Some(Commands::Provider { action }) => {
            ProviderCommandHandler::from_settings(&settings)
                .await?
                .execute(action, &mut stdout)
                .await
        }
    }
}

fn validate_command_args(cli: &Cli) -> AppResult<()> {
    cli.validate().map_err(|reason| AppError::Validation {
        field: "cli_arguments".to_string(),
        reason,
    })?;

    if let Some(Commands::Serve {
        host: Some(host),
        port: Some(port),
        ..
    }) = &cli.command
        && *port < 1024
        && host == "0.0.0.0"
    {
        tracing::warn!(host = %host, port, "Binding a privileged port usually requires root");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/notify".to_string();
        config.security.encryption_key = "1a".repeat(32);
        config
    }

    #[tokio::test]
    async fn test_execute_serve_dry_run() {
        let cli = Cli::try_parse_from(["notify-dispatch", "serve", "--dry-run"]).unwrap();
        assert!(execute_command(&cli, create_valid_config()).await.is_ok());
    }

    #[test]
    fn test_validate_command_args() {
        let cli = Cli::try_parse_from(["notify-dispatch", "serve", "--port", "8080"]).unwrap();
        assert!(validate_command_args(&cli).is_ok());
    }

    #[tokio::test]
    async fn test_provider_set_without_changes_is_rejected_before_connecting() {
        let cli = Cli::try_parse_from(["notify-dispatch", "provider", "set", "sinch"]).unwrap();
        let result = execute_command(&cli, create_valid_config()).await;
        assert!(matches!(result, Err(AppError::Validation { field, .. }) if field == "cli_arguments"));
    }
}
