//! Serve command handler

use crate::config::Settings;
use crate::error::AppResult;
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Runs the server until shutdown, or only validates with `dry_run`.
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }
        Server::new(self.config).run().await
    }

    /// Reports what `serve` would start without touching the network.
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        let providers = &self.config.providers;
        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!(
            "✓ Providers configured: ses={} sinch={}",
            providers.ses.is_some(),
            providers.sinch.is_some()
        );
        match &providers.callback_host {
            Some(host) => println!("✓ Delivery reports will be requested at {}", host),
            None => println!("! No callback_host set: providers will not send delivery reports"),
        }
        if self.config.tasks.enabled {
            println!(
                "✓ {} task worker(s), retention sweep at '{}'",
                self.config.tasks.worker_count, self.config.tasks.retention_sweep_cron
            );
        } else {
            println!("! Task workers disabled: queued notifications will not be sent");
        }
        println!("Dry run completed successfully");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/notify".to_string();
        config.security.encryption_key = "0f".repeat(32);
        config
    }

    #[test]
    fn test_serve_handler_new() {
        let config = create_valid_config();
        let handler = ServeCommandHandler::new(config.clone());
        assert_eq!(handler.config(), &config);
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run() {
        let handler = ServeCommandHandler::new(create_valid_config());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run_invalid_config() {
        let mut config = create_valid_config();
        config.server.port = 0;
        let handler = ServeCommandHandler::new(config);
        assert!(handler.execute(true).await.is_err());
    }
}
