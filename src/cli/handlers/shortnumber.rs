//! Short number administration.

use std::io::Write;

use super::{connect_repositories, output_error};
use crate::cli::parser::ShortNumberCommand;
use crate::config::Settings;
use crate::error::AppResult;
use crate::models::InboundShortNumber;
use crate::services::ShortNumberService;

pub struct ShortNumberCommandHandler {
    service: ShortNumberService,
}

impl ShortNumberCommandHandler {
    pub fn new(service: ShortNumberService) -> Self {
        Self { service }
    }

    pub async fn from_settings(settings: &Settings) -> AppResult<Self> {
        let repos = connect_repositories(settings).await?;
        Ok(Self::new(ShortNumberService::new(repos)))
    }

    pub async fn execute(&self, action: &ShortNumberCommand, out: &mut impl Write) -> AppResult<()> {
        match action {
            ShortNumberCommand::Add { short_number } => {
                let number = self.service.add(short_number).await?;
                writeln!(out, "✓ Added short number {} ({})", number.short_number, number.id)
            }
            ShortNumberCommand::List { available } => {
                let numbers = if *available {
                    self.service.list_available().await?
                } else {
                    self.service.list_all().await?
                };
                write_table(out, &numbers)
            }
            ShortNumberCommand::Allocate {
                service_id,
                short_number_id,
            } => {
                let number = self.service.allocate(*service_id, *short_number_id).await?;
                writeln!(
                    out,
                    "✓ Short number {} allocated to service {}",
                    number.short_number, service_id
                )
            }
            ShortNumberCommand::Deactivate {
                service_id,
                reactivate,
            } => {
                let number = self
                    .service
                    .set_active_for_service(*service_id, *reactivate)
                    .await?;
                let state = if number.active { "active" } else { "inactive" };
                writeln!(out, "✓ Short number {} is now {}", number.short_number, state)
            }
        }
        .map_err(output_error)
    }
}

fn write_table(out: &mut impl Write, numbers: &[InboundShortNumber]) -> std::io::Result<()> {
    if numbers.is_empty() {
        return writeln!(out, "No short numbers found");
    }
    writeln!(
        out,
        "{:<36}  {:<11}  {:<8}  {:<6}  SERVICE",
        "ID", "NUMBER", "PROVIDER", "ACTIVE"
    )?;
    for number in numbers {
        let service = number
            .service_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<36}  {:<11}  {:<8}  {:<6}  {}",
            number.id, number.short_number, number.provider, number.active, service
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::error::AppError;
    use crate::repositories::Repositories;
    use crate::repositories::memory::MemoryStore;

    fn handler(store: Arc<MemoryStore>) -> ShortNumberCommandHandler {
        ShortNumberCommandHandler::new(ShortNumberService::new(Repositories::memory(store)))
    }

    async fn run(handler: &ShortNumberCommandHandler, action: ShortNumberCommand) -> AppResult<String> {
        let mut out = Vec::new();
        handler.execute(&action, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_add_allocate_list_and_deactivate() {
        let store = Arc::new(MemoryStore::new());
        let service = store.add_service(false, 1000, &["sms", "inbound_sms_keyword"]);
        let handler = handler(store);

        let output = run(&handler, ShortNumberCommand::Add { short_number: "45678".into() })
            .await
            .unwrap();
        assert!(output.contains("Added short number 45678"));

        let listed = run(&handler, ShortNumberCommand::List { available: true }).await.unwrap();
        assert!(listed.contains("45678"));
        let number_id = handler.service.list_available().await.unwrap()[0].id;

        let output = run(
            &handler,
            ShortNumberCommand::Allocate {
                service_id: service.id,
                short_number_id: number_id,
            },
        )
        .await
        .unwrap();
        assert!(output.contains(&service.id.to_string()));
        assert_eq!(
            run(&handler, ShortNumberCommand::List { available: true }).await.unwrap(),
            "No short numbers found\n"
        );

        let output = run(
            &handler,
            ShortNumberCommand::Deactivate {
                service_id: service.id,
                reactivate: false,
            },
        )
        .await
        .unwrap();
        assert!(output.contains("is now inactive"));
    }

    #[tokio::test]
    async fn test_allocating_unknown_number_conflicts() {
        let store = Arc::new(MemoryStore::new());
        let service = store.add_service(false, 1000, &["sms"]);
        let handler = handler(store);

        let result = run(
            &handler,
            ShortNumberCommand::Allocate {
                service_id: service.id,
                short_number_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::AllocationConflict { .. })));
    }
}
