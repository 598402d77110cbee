//! One-off inbound keyword retention pass, the same work the scheduled
//! `sweep_inbound_keywords` task performs.

use std::io::Write;

use super::{connect_repositories, output_error};
use crate::config::Settings;
use crate::error::AppResult;
use crate::repositories::Repositories;
use crate::services::RetentionSweeper;

pub struct SweepCommandHandler {
    sweeper: RetentionSweeper,
}

impl SweepCommandHandler {
    pub fn new(sweeper: RetentionSweeper) -> Self {
        Self { sweeper }
    }

    pub async fn from_settings(settings: &Settings) -> AppResult<Self> {
        let repos = connect_repositories(settings).await?;
        Self::with_repositories(repos, settings)
    }

    pub(crate) fn with_repositories(repos: Repositories, settings: &Settings) -> AppResult<Self> {
        let retention = &settings.retention;
        Ok(Self::new(RetentionSweeper::new(
            repos,
            retention.default_days,
            retention.batch_size,
            retention.parsed_timezone()?,
        )))
    }

    pub async fn execute(&self, out: &mut impl Write) -> AppResult<usize> {
        let deleted = self.sweeper.sweep().await?;
        writeln!(out, "✓ Deleted {} inbound keyword message(s)", deleted).map_err(output_error)?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::InboundSmsKeyword;
    use crate::repositories::memory::MemoryStore;

    fn keyword(service_id: Uuid, age_days: i64) -> InboundSmsKeyword {
        let created_at = Utc::now() - Duration::days(age_days);
        InboundSmsKeyword {
            id: Uuid::new_v4(),
            service_id,
            content: "STOP".to_string(),
            notify_short_number: "45678".to_string(),
            user_number: "+16135550100".to_string(),
            created_at,
            provider_date: Some(created_at),
            provider_reference: Some("ref".to_string()),
            provider: "sinch".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sweep_reports_deleted_count() {
        let store = Arc::new(MemoryStore::new());
        let service = store.add_service(false, 1000, &["sms", "inbound_sms_keyword"]);
        store.insert_keyword(keyword(service.id, 30));
        store.insert_keyword(keyword(service.id, 0));

        let handler =
            SweepCommandHandler::with_repositories(Repositories::memory(store.clone()), &Settings::default())
                .unwrap();
        let mut out = Vec::new();
        let deleted = handler.execute(&mut out).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.keywords().len(), 1);
        assert!(String::from_utf8(out).unwrap().contains("Deleted 1 inbound keyword"));
    }

    #[test]
    fn test_unknown_timezone_is_configuration_error() {
        let mut settings = Settings::default();
        settings.retention.timezone = "Mars/Olympus_Mons".to_string();
        let store = Arc::new(MemoryStore::new());

        assert!(matches!(
            SweepCommandHandler::with_repositories(Repositories::memory(store), &settings),
            Err(crate::error::AppError::Configuration { key, .. }) if key == "retention.timezone"
        ));
    }
}
