//! Inbound keyword message repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::InboundSmsKeyword;
use crate::repositories::{KeywordQuery, KeywordStore, RetentionScope};

#[derive(Clone)]
pub struct InboundSmsKeywordRepository {
    pool: AsyncDbPool,
}

impl InboundSmsKeywordRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeywordStore for InboundSmsKeywordRepository {
    async fn create(&self, keyword: InboundSmsKeyword) -> AppResult<InboundSmsKeyword> {
        use crate::schema::inbound_sms_keyword::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::insert_into(inbound_sms_keyword)
            .values(&keyword)
            .returning(InboundSmsKeyword::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn list(&self, query: KeywordQuery) -> AppResult<Vec<InboundSmsKeyword>> {
        use crate::schema::inbound_sms_keyword::dsl::*;
        let mut conn = connection(&self.pool).await?;

        let mut q = inbound_sms_keyword
            .filter(service_id.eq(query.service_id))
            .order(created_at.desc())
            .select(InboundSmsKeyword::as_select())
            .into_boxed();
        if let Some(number) = query.user_number {
            q = q.filter(user_number.eq(number));
        }
        if let Some(since) = query.since {
            q = q.filter(created_at.ge(since));
        }
        if let Some(limit) = query.limit {
            q = q.limit(limit);
        }

        q.load(&mut conn).await.map_err(AppError::from)
    }

    async fn count_for_service(&self, service: Uuid, since: DateTime<Utc>) -> AppResult<i64> {
        use crate::schema::inbound_sms_keyword::dsl::*;
        let mut conn = connection(&self.pool).await?;

        inbound_sms_keyword
            .filter(service_id.eq(service))
            .filter(created_at.ge(since))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn find_by_id_and_service(
        &self,
        keyword_id: Uuid,
        service: Uuid,
    ) -> AppResult<Option<InboundSmsKeyword>> {
        use crate::schema::inbound_sms_keyword::dsl::*;
        let mut conn = connection(&self.pool).await?;

        inbound_sms_keyword
            .filter(id.eq(keyword_id))
            .filter(service_id.eq(service))
            .select(InboundSmsKeyword::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn delete_batch(
        &self,
        scope: &RetentionScope,
        cutoff: DateTime<Utc>,
        batch_size: i64,
    ) -> AppResult<usize> {
        use crate::schema::inbound_sms_keyword::dsl::*;
        let mut conn = connection(&self.pool).await?;

        let mut candidates = inbound_sms_keyword
            .select(id)
            .filter(created_at.lt(cutoff))
            .limit(batch_size)
            .into_boxed();
        candidates = match scope {
            RetentionScope::Service(service) => candidates.filter(service_id.eq(*service)),
            RetentionScope::AllExcept(excluded) => {
                candidates.filter(service_id.ne_all(excluded.clone()))
            }
        };
        let ids: Vec<Uuid> = candidates.load(&mut conn).await?;
        if ids.is_empty() {
            return Ok(0);
        }

        diesel::delete(
            inbound_sms_keyword
                .filter(id.eq_any(ids))
                .filter(created_at.lt(cutoff)),
        )
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }
}
