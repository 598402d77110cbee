//! Inbound short-number inventory and allocation to services.

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{InboundShortNumber, NewInboundShortNumber};
use crate::repositories::Repositories;
use crate::services::notifications::SINCH;

const MAX_SHORT_NUMBER_LEN: usize = 11;

#[derive(Clone)]
pub struct ShortNumberService {
    repos: Repositories,
}

impl ShortNumberService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Binds an active, unassigned number to `service_id`.
    ///
    /// Losing a race for the number, or asking for a second number for the
    /// same service, both surface as `AllocationConflict`.
    pub async fn allocate(
        &self,
        service_id: Uuid,
        short_number_id: Uuid,
    ) -> AppResult<InboundShortNumber> {
        let conflict = || AppError::AllocationConflict {
            short_number_id: short_number_id.to_string(),
        };
        match self
            .repos
            .short_numbers
            .allocate(short_number_id, service_id)
            .await
        {
            Ok(Some(number)) => {
                info!(%service_id, %short_number_id, short_number = %number.short_number, "Short number allocated");
                Ok(number)
            }
            Ok(None) => {
                warn!(%service_id, %short_number_id, "Short number not available for allocation");
                Err(conflict())
            }
            Err(AppError::Duplicate { .. }) => {
                warn!(%service_id, %short_number_id, "Service already owns a short number");
                Err(conflict())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn add(&self, short_number: &str) -> AppResult<InboundShortNumber> {
        let short_number = short_number.trim();
        if short_number.is_empty()
            || short_number.len() > MAX_SHORT_NUMBER_LEN
            || !short_number.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AppError::Validation {
                field: "short_number".to_string(),
                reason: format!("must be 1-{MAX_SHORT_NUMBER_LEN} letters or digits"),
            });
        }
        let number = self
            .repos
            .short_numbers
            .create(NewInboundShortNumber {
                id: Uuid::new_v4(),
                short_number: short_number.to_string(),
                provider: SINCH.to_string(),
                service_id: None,
                active: true,
            })
            .await?;
        info!(short_number_id = %number.id, short_number, "Short number added");
        Ok(number)
    }

    pub async fn list_all(&self) -> AppResult<Vec<InboundShortNumber>> {
        self.repos.short_numbers.list_all().await
    }

    pub async fn list_available(&self) -> AppResult<Vec<InboundShortNumber>> {
        self.repos.short_numbers.list_available().await
    }

    pub async fn get_for_service(&self, service_id: Uuid) -> AppResult<Option<InboundShortNumber>> {
        self.repos.short_numbers.find_for_service(service_id).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<InboundShortNumber> {
        self.repos
            .short_numbers
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("InboundShortNumber", "id", id))
    }

    pub async fn set_active_for_service(
        &self,
        service_id: Uuid,
        active: bool,
    ) -> AppResult<InboundShortNumber> {
        let number = self
            .repos
            .short_numbers
            .set_active_for_service(service_id, active)
            .await?
            .ok_or_else(|| AppError::not_found("InboundShortNumber", "service_id", service_id))?;
        info!(%service_id, short_number = %number.short_number, active, "Short number activity changed");
        Ok(number)
    }
}
