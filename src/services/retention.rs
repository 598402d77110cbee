//! Deletes inbound keyword messages that are past their service's retention
//! window.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::error::AppResult;
use crate::models::NotificationType;
use crate::repositories::{RetentionScope, Repositories};
use crate::utils::time::midnight_n_days_ago;

#[derive(Clone)]
pub struct RetentionSweeper {
    repos: Repositories,
    default_days: u64,
    batch_size: i64,
    timezone: Tz,
}

impl RetentionSweeper {
    pub fn new(repos: Repositories, default_days: u64, batch_size: i64, timezone: Tz) -> Self {
        Self {
            repos,
            default_days,
            batch_size,
            timezone,
        }
    }

    pub async fn sweep(&self) -> AppResult<usize> {
        self.sweep_at(Utc::now()).await
    }

    /// Custom sms retention first, then the default window for every service
    /// without one. Returns the number of keyword rows deleted.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let custom = self
            .repos
            .services
            .data_retention_for(NotificationType::Sms)
            .await?;

        let mut total = 0;
        for retention in &custom {
            let days = u64::try_from(retention.days_of_retention).unwrap_or(0);
            let cutoff = midnight_n_days_ago(days, self.timezone, now);
            let deleted = self
                .delete_until_empty(&RetentionScope::Service(retention.service_id), cutoff)
                .await?;
            info!(
                service_id = %retention.service_id,
                days_of_retention = retention.days_of_retention,
                %cutoff,
                deleted_count = deleted,
                "Deleted inbound keywords past custom retention"
            );
            total += deleted;
        }

        let excluded = custom.iter().map(|r| r.service_id).collect();
        let cutoff = midnight_n_days_ago(self.default_days, self.timezone, now);
        let deleted = self
            .delete_until_empty(&RetentionScope::AllExcept(excluded), cutoff)
            .await?;
        info!(
            days_of_retention = self.default_days,
            %cutoff,
            deleted_count = deleted,
            "Deleted inbound keywords past default retention"
        );
        total += deleted;

        info!(deleted_count = total, "Inbound keyword retention sweep finished");
        Ok(total)
    }

    async fn delete_until_empty(
        &self,
        scope: &RetentionScope,
        cutoff: DateTime<Utc>,
    ) -> AppResult<usize> {
        let mut deleted = 0;
        loop {
            let batch = self
                .repos
                .keywords
                .delete_batch(scope, cutoff, self.batch_size)
                .await?;
            if batch == 0 {
                return Ok(deleted);
            }
            deleted += batch;
        }
    }
}
