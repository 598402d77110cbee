//! Read access to a service's inbound keyword messages.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::InboundSmsKeyword;
use crate::repositories::{KeywordQuery, Repositories};
use crate::utils::time::midnight_n_days_ago;

#[derive(Clone)]
pub struct InboundKeywordService {
    repos: Repositories,
    default_days: u64,
    timezone: Tz,
}

impl InboundKeywordService {
    pub fn new(repos: Repositories, default_days: u64, timezone: Tz) -> Self {
        Self {
            repos,
            default_days,
            timezone,
        }
    }

    fn since(&self, limit_days: Option<u64>) -> DateTime<Utc> {
        midnight_n_days_ago(
            limit_days.unwrap_or(self.default_days),
            self.timezone,
            Utc::now(),
        )
    }

    /// Newest first.
    pub async fn list_for_service(
        &self,
        service_id: Uuid,
        user_number: Option<String>,
        limit_days: Option<u64>,
        limit: Option<i64>,
    ) -> AppResult<Vec<InboundSmsKeyword>> {
        self.repos
            .keywords
            .list(KeywordQuery {
                service_id,
                user_number,
                since: Some(self.since(limit_days)),
                limit,
            })
            .await
    }

    pub async fn count_for_service(&self, service_id: Uuid, limit_days: Option<u64>) -> AppResult<i64> {
        self.repos
            .keywords
            .count_for_service(service_id, self.since(limit_days))
            .await
    }

    pub async fn get_by_id_and_service(
        &self,
        id: Uuid,
        service_id: Uuid,
    ) -> AppResult<InboundSmsKeyword> {
        self.repos
            .keywords
            .find_by_id_and_service(id, service_id)
            .await?
            .ok_or_else(|| AppError::not_found("InboundSmsKeyword", "id", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::models::SMS_PERMISSION;
    use crate::repositories::memory::MemoryStore;

    fn keyword(service_id: Uuid, user_number: &str, age: Duration) -> InboundSmsKeyword {
        InboundSmsKeyword {
            id: Uuid::new_v4(),
            service_id,
            content: "HELP".into(),
            notify_short_number: "555123".into(),
            user_number: user_number.into(),
            created_at: Utc::now() - age,
            provider_date: None,
            provider_reference: None,
            provider: "sinch".into(),
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = Arc::new(MemoryStore::new());
        let service = store.add_service(false, 100, &[SMS_PERMISSION]);
        let other = store.add_service(false, 100, &[SMS_PERMISSION]);
        let older = keyword(service.id, "+16502530000", Duration::days(1));
        let newer = keyword(service.id, "+16502530000", Duration::minutes(1));
        store.insert_keyword(older.clone());
        store.insert_keyword(newer.clone());
        store.insert_keyword(keyword(service.id, "+16502530001", Duration::minutes(2)));
        store.insert_keyword(keyword(service.id, "+16502530000", Duration::days(30)));
        store.insert_keyword(keyword(other.id, "+16502530000", Duration::minutes(1)));

        let keywords =
            InboundKeywordService::new(Repositories::memory(store), 7, chrono_tz::America::Toronto);

        let listed = keywords
            .list_for_service(service.id, Some("+16502530000".into()), None, None)
            .await
            .unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        assert_eq!(keywords.count_for_service(service.id, None).await.unwrap(), 3);
        assert_eq!(keywords.count_for_service(service.id, Some(60)).await.unwrap(), 4);

        assert!(matches!(
            keywords.get_by_id_and_service(newer.id, other.id).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        assert_eq!(
            keywords.get_by_id_and_service(newer.id, service.id).await.unwrap(),
            newer
        );
    }
}
