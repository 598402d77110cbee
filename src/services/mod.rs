//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories, provider clients and the task queue.

mod callbacks;
mod dispatch;
mod intake;
mod keywords;
pub mod notifications;
mod registry;
mod retention;
mod short_numbers;

use std::sync::Arc;

use chrono_tz::Tz;

pub use callbacks::{
    CallbackReconciler, DeliveryReportOutcome, InboundKeywordMessage, KeywordOutcome,
};
pub use dispatch::{DeliveryRequest, DispatchEngine, DispatchError, DispatchOutcome};
pub use intake::{
    IntakeService, JobIntakeOutcome, JobRequest, NotificationRequest, QueuedNotification,
};
pub use keywords::InboundKeywordService;
pub use registry::{ProviderHandle, ProviderRegistry};
pub use retention::RetentionSweeper;
pub use short_numbers::ShortNumberService;

use crate::config::RetentionConfig;
use crate::error::AppResult;
use crate::repositories::Repositories;
use crate::services::notifications::ProviderClient;
use crate::tasks::TaskQueue;
use crate::utils::Encryptor;

/// Aggregates all services for convenient access.
///
/// This struct is designed to be used as Axum application state and as the
/// task context. Cloning is cheap since everything inside is reference counted.
#[derive(Clone)]
pub struct Services {
    pub registry: ProviderRegistry,
    pub dispatch: DispatchEngine,
    pub intake: IntakeService,
    pub callbacks: CallbackReconciler,
    pub retention: RetentionSweeper,
    pub short_numbers: ShortNumberService,
    pub keywords: InboundKeywordService,
}

impl Services {
    pub fn new(
        repos: Repositories,
        clients: Vec<Arc<dyn ProviderClient>>,
        encryptor: Encryptor,
        queue: Arc<dyn TaskQueue>,
        retention: &RetentionConfig,
    ) -> AppResult<Self> {
        let timezone: Tz = retention.parsed_timezone()?;
        let encryptor = Arc::new(encryptor);
        let registry = ProviderRegistry::new(repos.providers.clone(), clients);

        Ok(Self {
            dispatch: DispatchEngine::new(repos.clone(), registry.clone(), encryptor.clone()),
            intake: IntakeService::new(repos.clone(), encryptor, queue, timezone),
            callbacks: CallbackReconciler::new(repos.clone()),
            retention: RetentionSweeper::new(
                repos.clone(),
                retention.default_days,
                retention.batch_size,
                timezone,
            ),
            short_numbers: ShortNumberService::new(repos.clone()),
            keywords: InboundKeywordService::new(repos, retention.default_days, timezone),
            registry,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        store: Arc<crate::repositories::memory::MemoryStore>,
        clients: Vec<Arc<dyn ProviderClient>>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        let encryptor = Encryptor::from_hex(dispatch::tests::TEST_KEY).unwrap();
        Self::new(
            Repositories::memory(store),
            clients,
            encryptor,
            queue,
            &RetentionConfig::default(),
        )
        .unwrap()
    }
}

#[cfg(test)]
pub(crate) use dispatch::tests::encryptor as test_encryptor;
#[cfg(test)]
pub(crate) use registry::tests::mock_client;
