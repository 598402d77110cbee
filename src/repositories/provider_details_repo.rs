//! Provider details repository.
//!
//! Reads always hit the table so registry decisions see admin changes
//! immediately.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::{NotificationType, ProviderDetail, ProviderDetailChanges, ProviderDetailHistory};
use crate::repositories::ProviderStore;

#[derive(Clone)]
pub struct ProviderDetailsRepository {
    pool: AsyncDbPool,
}

impl ProviderDetailsRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderStore for ProviderDetailsRepository {
    async fn list(&self, channel: Option<NotificationType>) -> AppResult<Vec<ProviderDetail>> {
        use crate::schema::provider_details::dsl::*;
        let mut conn = connection(&self.pool).await?;

        let mut query = provider_details
            .select(ProviderDetail::as_select())
            .order((priority.desc(), identifier.asc()))
            .into_boxed();
        if let Some(kind) = channel {
            query = query.filter(notification_type.eq(kind));
        }

        query.load(&mut conn).await.map_err(AppError::from)
    }

    async fn find_by_identifier(&self, ident: &str) -> AppResult<Option<ProviderDetail>> {
        use crate::schema::provider_details::dsl::*;
        let mut conn = connection(&self.pool).await?;

        provider_details
            .filter(identifier.eq(ident))
            .select(ProviderDetail::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn update(
        &self,
        ident: &str,
        changes: ProviderDetailChanges,
    ) -> AppResult<ProviderDetail> {
        use crate::schema::provider_details::dsl::*;
        use crate::schema::provider_details_history;
        let mut conn = connection(&self.pool).await?;
        let ident = ident.to_string();

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let updated = diesel::update(provider_details.filter(identifier.eq(&ident)))
                    .set((
                        changes.priority.map(|p| priority.eq(p)),
                        changes.active.map(|a| active.eq(a)),
                        version.eq(version + 1),
                        updated_at.eq(Utc::now()),
                    ))
                    .returning(ProviderDetail::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("ProviderDetail", "identifier", &ident))?;

                diesel::insert_into(provider_details_history::table)
                    .values(&ProviderDetailHistory::from(&updated))
                    .execute(conn)
                    .await?;

                Ok(updated)
            }
            .scope_boxed()
        })
        .await
    }
}
