//! Storage seams used by the services.
//!
//! Each trait has a Postgres implementation in this module's siblings; tests
//! swap in the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    InboundShortNumber, InboundSmsKeyword, Job, JobStatus, NewInboundShortNumber, NewJob,
    NewNotification, Notification, NotificationStatus, NotificationStatusUpdate,
    NotificationType, ProviderDetail, ProviderDetailChanges, Service, ServiceDataRetention,
    ServiceSafelistEntry, ServiceWithPermissions, Template,
};

#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn list(&self, channel: Option<NotificationType>) -> AppResult<Vec<ProviderDetail>>;
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<ProviderDetail>>;
    /// Applies the changes, bumps `version` and records a history row.
    async fn update(
        &self,
        identifier: &str,
        changes: ProviderDetailChanges,
    ) -> AppResult<ProviderDetail>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: NewNotification) -> AppResult<Notification>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Notification>>;
    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<Notification>>;
    /// Compare-and-swap: applies `update` only while the row's status is in
    /// `from`. Returns `None` when the guard did not match.
    async fn transition(
        &self,
        id: Uuid,
        from: &[NotificationStatus],
        update: NotificationStatusUpdate,
    ) -> AppResult<Option<Notification>>;
    async fn count_for_service_since(&self, service_id: Uuid, since: DateTime<Utc>)
    -> AppResult<i64>;
}

#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn find_with_permissions(&self, id: Uuid) -> AppResult<Option<ServiceWithPermissions>>;
    /// Service bound to an active inbound short number.
    async fn find_by_inbound_short_number(
        &self,
        short_number: &str,
    ) -> AppResult<Option<ServiceWithPermissions>>;
    async fn safelist(&self, service_id: Uuid) -> AppResult<Vec<ServiceSafelistEntry>>;
    async fn data_retention_for(
        &self,
        notification_type: NotificationType,
    ) -> AppResult<Vec<ServiceDataRetention>>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find(&self, id: Uuid, version: i32) -> AppResult<Option<Template>>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: NewJob) -> AppResult<Job>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;
    async fn set_status(&self, id: Uuid, status: JobStatus) -> AppResult<Job>;
}

/// Which rows a retention batch may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionScope {
    Service(Uuid),
    AllExcept(Vec<Uuid>),
}

#[async_trait]
pub trait ShortNumberStore: Send + Sync {
    async fn list_all(&self) -> AppResult<Vec<InboundShortNumber>>;
    async fn list_available(&self) -> AppResult<Vec<InboundShortNumber>>;
    async fn find_for_service(&self, service_id: Uuid) -> AppResult<Option<InboundShortNumber>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InboundShortNumber>>;
    /// Single conditional update guarded by `active AND service_id IS NULL`.
    async fn allocate(&self, id: Uuid, service_id: Uuid) -> AppResult<Option<InboundShortNumber>>;
    async fn set_active_for_service(
        &self,
        service_id: Uuid,
        active: bool,
    ) -> AppResult<Option<InboundShortNumber>>;
    async fn create(&self, short_number: NewInboundShortNumber) -> AppResult<InboundShortNumber>;
}

/// Filters for listing a service's keyword messages.
#[derive(Debug, Clone, Default)]
pub struct KeywordQuery {
    pub service_id: Uuid,
    pub user_number: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[async_trait]
pub trait KeywordStore: Send + Sync {
    async fn create(&self, keyword: InboundSmsKeyword) -> AppResult<InboundSmsKeyword>;
    async fn list(&self, query: KeywordQuery) -> AppResult<Vec<InboundSmsKeyword>>;
    async fn count_for_service(&self, service_id: Uuid, since: DateTime<Utc>) -> AppResult<i64>;
    async fn find_by_id_and_service(
        &self,
        id: Uuid,
        service_id: Uuid,
    ) -> AppResult<Option<InboundSmsKeyword>>;
    /// Deletes at most `batch_size` rows older than `cutoff` within `scope`.
    async fn delete_batch(
        &self,
        scope: &RetentionScope,
        cutoff: DateTime<Utc>,
        batch_size: i64,
    ) -> AppResult<usize>;
}
