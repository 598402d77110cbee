//! Provider registry administration.
//!
//! Changes take effect on the next dispatch; running servers read the
//! registry on every selection.

use std::io::Write;

use super::{connect_repositories, output_error};
use crate::cli::parser::ProviderCommand;
use crate::config::Settings;
use crate::error::AppResult;
use crate::models::{ProviderDetail, ProviderDetailChanges};
use crate::services::ProviderRegistry;

pub struct ProviderCommandHandler {
    registry: ProviderRegistry,
}

impl ProviderCommandHandler {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Admin commands never send, so the registry is built without clients.
    pub async fn from_settings(settings: &Settings) -> AppResult<Self> {
        let repos = connect_repositories(settings).await?;
        Ok(Self::new(ProviderRegistry::new(repos.providers, Vec::new())))
    }

    pub async fn execute(&self, action: &ProviderCommand, out: &mut impl Write) -> AppResult<()> {
        match action {
            ProviderCommand::List { channel } => {
                let mut providers = self
                    .registry
                    .list_providers(channel.map(Into::into))
                    .await?;
                providers.sort_by(|a, b| {
                    a.notification_type
                        .as_str()
                        .cmp(b.notification_type.as_str())
                        .then_with(|| b.priority.cmp(&a.priority))
                        .then_with(|| a.identifier.cmp(&b.identifier))
                });
                write_table(out, &providers)
            }
            ProviderCommand::Set {
                identifier,
                priority,
                active,
            } => {
                let changes = ProviderDetailChanges {
                    priority: *priority,
                    active: *active,
                };
                let updated = self.registry.update_provider(identifier, changes).await?;
                writeln!(
                    out,
                    "✓ {} now priority={} active={} (version {})",
                    updated.identifier, updated.priority, updated.active, updated.version
                )
            }
        }
        .map_err(output_error)
    }
}

fn write_table(out: &mut impl Write, providers: &[ProviderDetail]) -> std::io::Result<()> {
    if providers.is_empty() {
        return writeln!(out, "No providers found");
    }
    writeln!(
        out,
        "{:<12}  {:<7}  {:>8}  {:<6}  VERSION",
        "IDENTIFIER", "CHANNEL", "PRIORITY", "ACTIVE"
    )?;
    for p in providers {
        writeln!(
            out,
            "{:<12}  {:<7}  {:>8}  {:<6}  {}",
            p.identifier, p.notification_type, p.priority, p.active, p.version
        )?;
    }
    Ok(())
}
