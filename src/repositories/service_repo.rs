//! Read access to services, their permissions, safelists and retention policies.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::{
    NotificationType, Service, ServiceDataRetention, ServiceSafelistEntry, ServiceWithPermissions,
};
use crate::repositories::ServiceStore;

#[derive(Clone)]
pub struct ServiceRepository {
    pool: AsyncDbPool,
}

impl ServiceRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn attach_permissions(
        conn: &mut AsyncPgConnection,
        service: Service,
    ) -> AppResult<ServiceWithPermissions> {
        use crate::schema::service_permissions::dsl::*;

        let permissions = service_permissions
            .filter(service_id.eq(service.id))
            .select(permission)
            .order(permission.asc())
            .load::<String>(conn)
            .await?;

        Ok(ServiceWithPermissions {
            service,
            permissions,
        })
    }
}

#[async_trait]
impl ServiceStore for ServiceRepository {
    async fn find_with_permissions(&self, service: Uuid) -> AppResult<Option<ServiceWithPermissions>> {
        use crate::schema::services::dsl::*;
        let mut conn = connection(&self.pool).await?;

        let found = services
            .filter(id.eq(service))
            .select(Service::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        match found {
            Some(svc) => Ok(Some(Self::attach_permissions(&mut conn, svc).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_inbound_short_number(
        &self,
        number: &str,
    ) -> AppResult<Option<ServiceWithPermissions>> {
        use crate::schema::{inbound_shortnumbers, services};
        let mut conn = connection(&self.pool).await?;

        let found = services::table
            .inner_join(inbound_shortnumbers::table)
            .filter(inbound_shortnumbers::short_number.eq(number))
            .filter(inbound_shortnumbers::active.eq(true))
            .select(Service::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        match found {
            Some(svc) => Ok(Some(Self::attach_permissions(&mut conn, svc).await?)),
            None => Ok(None),
        }
    }

    async fn safelist(&self, service: Uuid) -> AppResult<Vec<ServiceSafelistEntry>> {
        use crate::schema::service_safelist::dsl::*;
        let mut conn = connection(&self.pool).await?;

        service_safelist
            .filter(service_id.eq(service))
            .select(ServiceSafelistEntry::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn data_retention_for(
        &self,
        kind: NotificationType,
    ) -> AppResult<Vec<ServiceDataRetention>> {
        use crate::schema::service_data_retention::dsl::*;
        let mut conn = connection(&self.pool).await?;

        service_data_retention
            .filter(notification_type.eq(kind))
            .select(ServiceDataRetention::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
