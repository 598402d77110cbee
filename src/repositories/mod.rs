//! Repository layer for data access operations.
//!
//! Services depend on the store traits; `Repositories::postgres` wires the
//! diesel-async implementations.

mod inbound_shortnumber_repo;
mod inbound_sms_keyword_repo;
mod job_repo;
#[cfg(test)]
pub(crate) mod memory;
mod notification_repo;
mod provider_details_repo;
mod service_repo;
mod template_repo;
mod traits;

use std::sync::Arc;

pub use inbound_shortnumber_repo::InboundShortNumberRepository;
pub use inbound_sms_keyword_repo::InboundSmsKeywordRepository;
pub use job_repo::JobRepository;
pub use notification_repo::NotificationRepository;
pub use provider_details_repo::ProviderDetailsRepository;
pub use service_repo::ServiceRepository;
pub use template_repo::TemplateRepository;
pub use traits::{
    JobStore, KeywordQuery, KeywordStore, NotificationStore, ProviderStore, RetentionScope,
    ServiceStore, ShortNumberStore, TemplateStore,
};

use crate::db::AsyncDbPool;

/// Aggregates all stores for convenient access.
///
/// Cloning is cheap: every field is reference counted.
#[derive(Clone)]
pub struct Repositories {
    pub providers: Arc<dyn ProviderStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub services: Arc<dyn ServiceStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub jobs: Arc<dyn JobStore>,
    pub short_numbers: Arc<dyn ShortNumberStore>,
    pub keywords: Arc<dyn KeywordStore>,
}

impl Repositories {
    /// Creates the Postgres-backed stores sharing one pool.
    pub fn postgres(pool: AsyncDbPool) -> Self {
        Self {
            providers: Arc::new(ProviderDetailsRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            services: Arc::new(ServiceRepository::new(pool.clone())),
            templates: Arc::new(TemplateRepository::new(pool.clone())),
            jobs: Arc::new(JobRepository::new(pool.clone())),
            short_numbers: Arc::new(InboundShortNumberRepository::new(pool.clone())),
            keywords: Arc::new(InboundSmsKeywordRepository::new(pool)),
        }
    }

    #[cfg(test)]
    pub(crate) fn memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            providers: store.clone(),
            notifications: store.clone(),
            services: store.clone(),
            templates: store.clone(),
            jobs: store.clone(),
            short_numbers: store.clone(),
            keywords: store,
        }
    }
}
