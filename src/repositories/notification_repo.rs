//! Notification repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::{NewNotification, Notification, NotificationStatus, NotificationStatusUpdate};
use crate::repositories::NotificationStore;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: AsyncDbPool,
}

impl NotificationRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, new_notification: NewNotification) -> AppResult<Notification> {
        use crate::schema::notifications::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::insert_into(notifications)
            .values(&new_notification)
            .returning(Notification::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn find_by_id(&self, notification_id: Uuid) -> AppResult<Option<Notification>> {
        use crate::schema::notifications::dsl::*;
        let mut conn = connection(&self.pool).await?;

        notifications
            .filter(id.eq(notification_id))
            .select(Notification::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn find_by_reference(&self, provider_reference: &str) -> AppResult<Option<Notification>> {
        use crate::schema::notifications::dsl::*;
        let mut conn = connection(&self.pool).await?;

        notifications
            .filter(reference.eq(provider_reference))
            .select(Notification::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn transition(
        &self,
        notification_id: Uuid,
        from: &[NotificationStatus],
        update: NotificationStatusUpdate,
    ) -> AppResult<Option<Notification>> {
        use crate::schema::notifications::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::update(
            notifications
                .filter(id.eq(notification_id))
                .filter(status.eq_any(from.to_vec())),
        )
        .set(&update)
        .returning(Notification::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(AppError::from)
    }

    async fn count_for_service_since(
        &self,
        service: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        use crate::schema::notifications::dsl::*;
        let mut conn = connection(&self.pool).await?;

        notifications
            .filter(service_id.eq(service))
            .filter(created_at.ge(since))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
