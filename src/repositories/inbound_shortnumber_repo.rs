//! Inbound short number repository.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::{InboundShortNumber, NewInboundShortNumber};
use crate::repositories::ShortNumberStore;

#[derive(Clone)]
pub struct InboundShortNumberRepository {
    pool: AsyncDbPool,
}

impl InboundShortNumberRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortNumberStore for InboundShortNumberRepository {
    async fn list_all(&self) -> AppResult<Vec<InboundShortNumber>> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        inbound_shortnumbers
            .order(updated_at.asc())
            .select(InboundShortNumber::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn list_available(&self) -> AppResult<Vec<InboundShortNumber>> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        inbound_shortnumbers
            .filter(active.eq(true))
            .filter(service_id.is_null())
            .order(short_number.asc())
            .select(InboundShortNumber::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn find_for_service(&self, service: Uuid) -> AppResult<Option<InboundShortNumber>> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        inbound_shortnumbers
            .filter(service_id.eq(service))
            .select(InboundShortNumber::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn find_by_id(&self, number_id: Uuid) -> AppResult<Option<InboundShortNumber>> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        inbound_shortnumbers
            .filter(id.eq(number_id))
            .select(InboundShortNumber::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn allocate(&self, number_id: Uuid, service: Uuid) -> AppResult<Option<InboundShortNumber>> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::update(
            inbound_shortnumbers
                .filter(id.eq(number_id))
                .filter(active.eq(true))
                .filter(service_id.is_null()),
        )
        .set((service_id.eq(service), updated_at.eq(Utc::now())))
        .returning(InboundShortNumber::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(AppError::from)
    }

    async fn set_active_for_service(
        &self,
        service: Uuid,
        is_active: bool,
    ) -> AppResult<Option<InboundShortNumber>> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::update(inbound_shortnumbers.filter(service_id.eq(service)))
            .set((active.eq(is_active), updated_at.eq(Utc::now())))
            .returning(InboundShortNumber::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn create(&self, new_number: NewInboundShortNumber) -> AppResult<InboundShortNumber> {
        use crate::schema::inbound_shortnumbers::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::insert_into(inbound_shortnumbers)
            .values(&new_number)
            .returning(InboundShortNumber::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
