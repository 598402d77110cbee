//! Provider selection over the persisted registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{NotificationType, ProviderDetail, ProviderDetailChanges};
use crate::repositories::ProviderStore;
use crate::services::notifications::ProviderClient;

/// A selected provider together with the client that talks to it.
#[derive(Clone)]
pub struct ProviderHandle {
    pub detail: ProviderDetail,
    pub client: Arc<dyn ProviderClient>,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("identifier", &self.detail.identifier)
            .field("priority", &self.detail.priority)
            .finish()
    }
}

/// Reads provider state from the store on every call, so admin changes take
/// effect on the next selection.
#[derive(Clone)]
pub struct ProviderRegistry {
    store: Arc<dyn ProviderStore>,
    clients: Arc<HashMap<&'static str, Arc<dyn ProviderClient>>>,
}

impl ProviderRegistry {
    pub fn new(store: Arc<dyn ProviderStore>, clients: Vec<Arc<dyn ProviderClient>>) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.identifier(), client))
            .collect();
        Self {
            store,
            clients: Arc::new(clients),
        }
    }

    pub fn client(&self, identifier: &str) -> Option<Arc<dyn ProviderClient>> {
        self.clients.get(identifier).cloned()
    }

    /// Active provider with the highest priority; ties go to the
    /// alphabetically first identifier. `recipient` is only logged.
    pub async fn select_provider(
        &self,
        channel: NotificationType,
        recipient: &str,
    ) -> AppResult<ProviderHandle> {
        let detail = self
            .store
            .list(Some(channel))
            .await?
            .into_iter()
            .filter(|p| p.active)
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.identifier.cmp(&b.identifier))
            })
            .ok_or_else(|| {
                warn!(%channel, "No active provider configured");
                AppError::NoProviderAvailable {
                    channel: channel.to_string(),
                }
            })?;

        let client = self
            .client(&detail.identifier)
            .ok_or_else(|| AppError::ProviderNotConfigured {
                identifier: detail.identifier.clone(),
            })?;

        debug!(
            provider = %detail.identifier,
            priority = detail.priority,
            recipient,
            "Selected provider"
        );
        Ok(ProviderHandle { detail, client })
    }

    pub async fn list_providers(
        &self,
        channel: Option<NotificationType>,
    ) -> AppResult<Vec<ProviderDetail>> {
        self.store.list(channel).await
    }

    pub async fn update_provider(
        &self,
        identifier: &str,
        changes: ProviderDetailChanges,
    ) -> AppResult<ProviderDetail> {
        if changes.is_empty() {
            return Err(AppError::BadRequest {
                message: "Nothing to update: set priority or active".to_string(),
            });
        }
        let updated = self.store.update(identifier, changes).await?;
        tracing::info!(
            provider = %updated.identifier,
            priority = updated.priority,
            active = updated.active,
            version = updated.version,
            "Provider updated"
        );
        Ok(updated)
    }
}
