//! Delivery of a single notification through the selected provider.
//!
//! Status moves `created → sending → {delivered, temporary-failure,
//! permanent-failure, technical-failure}`; every move is a guarded update so
//! concurrent callbacks and retried tasks cannot regress a row.
//!
//! A provider acknowledgement is held in memory until its reference is
//! stored, so a retry after a failed write records it instead of sending
//! again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics;
use crate::models::{
    NewNotification, Notification, NotificationPayload, NotificationStatus,
    NotificationStatusUpdate, NotificationType, RenderedTemplate, ServiceWithPermissions,
    StatisticsTag,
};
use crate::repositories::Repositories;
use crate::services::notifications::{
    OutboundEmail, OutboundMessage, OutboundSms, ProviderError, ProviderReference,
};
use crate::services::registry::ProviderRegistry;
use crate::utils::Encryptor;

/// Arguments of a delivery task.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub service_id: Uuid,
    pub notification_id: Uuid,
    pub encrypted_payload: String,
    pub created_at: DateTime<Utc>,
    pub channel: NotificationType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Provider accepted the message; `sent_by` and `reference` are stored.
    Sent {
        provider: &'static str,
        reference: String,
    },
    /// Provider refused the message for good; the failure status is stored.
    Failed { status: NotificationStatus },
    /// Restricted service sending outside its safelist; nothing stored.
    Rejected { reason: String },
    /// The row already moved past `sending`; nothing was sent.
    AlreadyProcessed,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Worth another attempt; the task substrate reschedules.
    #[error("Delivery failed, will retry: {0}")]
    Retryable(#[source] AppError),

    #[error("Delivery failed permanently: {0}")]
    Fatal(#[source] AppError),
}

impl DispatchError {
    /// Storage hiccups are retried, everything else is final.
    fn from_app(error: AppError) -> Self {
        if error.is_storage() {
            DispatchError::Retryable(error)
        } else {
            DispatchError::Fatal(error)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Retryable(_))
    }
}

/// Acknowledged sends whose reference is not stored yet, by notification.
type UnrecordedAcknowledgements = Arc<Mutex<HashMap<Uuid, (&'static str, String)>>>;

#[derive(Clone)]
pub struct DispatchEngine {
    repos: Repositories,
    registry: ProviderRegistry,
    encryptor: Arc<Encryptor>,
    unrecorded: UnrecordedAcknowledgements,
}

impl DispatchEngine {
    pub fn new(repos: Repositories, registry: ProviderRegistry, encryptor: Arc<Encryptor>) -> Self {
        Self {
            repos,
            registry,
            encryptor,
            unrecorded: Arc::default(),
        }
    }

    pub async fn deliver(&self, request: DeliveryRequest) -> Result<DispatchOutcome, DispatchError> {
        let notification_id = request.notification_id;
        if let Some((provider, reference)) = self.unrecorded_acknowledgement(notification_id) {
            info!(%notification_id, provider, "Storing acknowledgement from an earlier attempt");
            return self.acknowledge(notification_id, provider, reference).await;
        }

        let payload: NotificationPayload = self
            .encryptor
            .decrypt_json(&request.encrypted_payload)
            .map_err(|e| DispatchError::Fatal(e.into()))?;

        let existing = self
            .repos
            .notifications
            .find_by_id(notification_id)
            .await
            .map_err(DispatchError::from_app)?;

        let service = self
            .repos
            .services
            .find_with_permissions(request.service_id)
            .await
            .map_err(DispatchError::from_app)?
            .ok_or_else(|| {
                DispatchError::Fatal(AppError::not_found("Service", "id", request.service_id))
            })?;

        if existing.is_none() && service.service.restricted {
            let allowed = self
                .repos
                .services
                .safelist(service.service.id)
                .await
                .map_err(DispatchError::from_app)?
                .iter()
                .any(|entry| entry.recipient_type == request.channel && entry.matches(&payload.to));
            if !allowed {
                warn!(
                    %notification_id,
                    service_id = %service.service.id,
                    "Restricted service cannot send to a recipient outside its safelist"
                );
                return Ok(DispatchOutcome::Rejected {
                    reason: "Can't send to this recipient when service is in trial mode".to_string(),
                });
            }
        }

        let template = self
            .repos
            .templates
            .find(payload.template, payload.template_version)
            .await
            .map_err(DispatchError::from_app)?
            .ok_or_else(|| {
                DispatchError::Fatal(AppError::not_found("Template", "id", payload.template))
            })?;
        let personalisation = payload.personalisation.clone().unwrap_or_default();
        let rendered = template.render(&personalisation);

        let handle = self
            .registry
            .select_provider(request.channel, &payload.to)
            .await
            .map_err(DispatchError::from_app)?;
        let provider = handle.client.identifier();

        let recipient = handle
            .client
            .validate_recipient(&payload.to)
            .map_err(|e| {
                warn!(%notification_id, provider, error = %e, "Recipient failed provider validation");
                DispatchError::Fatal(AppError::InvalidRecipient {
                    reason: e.to_string(),
                })
            })?;

        if existing.is_none() {
            self.persist_created(&request, &payload, &personalisation)
                .await?;
        }

        let claimed = match self
            .transition(notification_id, NotificationStatus::Sending)
            .await?
        {
            Some(row) => Some(row),
            None => self.reclaim_abandoned(notification_id).await?,
        };
        if claimed.is_none() {
            info!(%notification_id, "Notification already processed, skipping send");
            return Ok(DispatchOutcome::AlreadyProcessed);
        }

        let message = build_message(notification_id, &service, &payload, recipient, rendered, request.channel);
        match handle.client.send(&message).await {
            Ok(ProviderReference(reference)) => {
                self.acknowledge(notification_id, provider, reference).await
            }
            Err(err) => self.record_failure(notification_id, provider, err).await,
        }
    }

    async fn persist_created(
        &self,
        request: &DeliveryRequest,
        payload: &NotificationPayload,
        personalisation: &HashMap<String, String>,
    ) -> Result<Notification, DispatchError> {
        let sealed = if personalisation.is_empty() {
            None
        } else {
            Some(
                self.encryptor
                    .encrypt_json(personalisation)
                    .map_err(|e| DispatchError::Fatal(e.into()))?,
            )
        };
        let email_parameters = payload
            .email_parameters
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok());

        let new = NewNotification {
            id: request.notification_id,
            service_id: request.service_id,
            template_id: payload.template,
            template_version: payload.template_version,
            notification_type: request.channel,
            to: payload.to.clone(),
            personalisation: sealed,
            status: NotificationStatus::Created,
            created_at: request.created_at,
            job_id: payload.job,
            job_row_number: payload.row_number,
            additional_email_parameters: email_parameters,
        };
        self.repos.notifications.create(new).await.map_err(|e| {
            error!(notification_id = %request.notification_id, error = %e, "Failed to persist notification");
            DispatchError::Retryable(e)
        })
    }

    async fn transition(
        &self,
        id: Uuid,
        status: NotificationStatus,
    ) -> Result<Option<Notification>, DispatchError> {
        self.repos
            .notifications
            .transition(id, status.allowed_predecessors(), NotificationStatusUpdate::status(status))
            .await
            .map_err(DispatchError::Retryable)
    }

    /// A row in `sending` without a reference belongs to an attempt that was
    /// cut off before the provider answered. It is failed as technical so this
    /// attempt can claim it and send again.
    async fn reclaim_abandoned(&self, id: Uuid) -> Result<Option<Notification>, DispatchError> {
        let current = self
            .repos
            .notifications
            .find_by_id(id)
            .await
            .map_err(DispatchError::Retryable)?;
        let abandoned = current.is_some_and(|row| {
            row.status == NotificationStatus::Sending && row.reference.is_none()
        });
        if !abandoned {
            return Ok(None);
        }

        warn!(notification_id = %id, "Notification was left sending without a provider reference, sending again");
        let failed = self
            .repos
            .notifications
            .transition(
                id,
                &[NotificationStatus::Sending],
                NotificationStatusUpdate::status(NotificationStatus::TechnicalFailure),
            )
            .await
            .map_err(DispatchError::Retryable)?;
        if failed.is_none() {
            return Ok(None);
        }
        self.transition(id, NotificationStatus::Sending).await
    }

    fn unrecorded_acknowledgement(&self, id: Uuid) -> Option<(&'static str, String)> {
        self.unrecorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    async fn acknowledge(
        &self,
        id: Uuid,
        provider: &'static str,
        reference: String,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.unrecorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (provider, reference.clone()));

        let update = NotificationStatusUpdate::acknowledged(provider, reference.clone());
        let stored = self
            .repos
            .notifications
            .transition(id, &[NotificationStatus::Sending], update)
            .await
            .map_err(|e| {
                error!(notification_id = %id, provider, %reference, error = %e, "Failed to record provider acknowledgement");
                DispatchError::Retryable(e)
            })?;

        self.unrecorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if stored.is_none() {
            warn!(notification_id = %id, provider, "Notification left sending before acknowledgement was stored");
        }
        metrics::record_status(provider, NotificationStatus::Sending.as_str());
        info!(notification_id = %id, provider, %reference, "Notification sent");
        Ok(DispatchOutcome::Sent {
            provider,
            reference,
        })
    }

    async fn record_failure(
        &self,
        id: Uuid,
        provider: &'static str,
        err: ProviderError,
    ) -> Result<DispatchOutcome, DispatchError> {
        let status = err.failure_status();
        error!(notification_id = %id, provider, %status, error = %err, "Provider send failed");
        self.transition(id, status).await?;
        metrics::record_status(provider, status.as_str());
        metrics::record_statistics(provider, StatisticsTag::Failure);

        let app_error = |message: String| AppError::Provider {
            provider: provider.to_string(),
            message,
        };
        match err {
            ProviderError::Rejected { .. } => Ok(DispatchOutcome::Failed { status }),
            ProviderError::InvalidRecipient(reason) => {
                Err(DispatchError::Fatal(AppError::InvalidRecipient { reason }))
            }
            ProviderError::UnsupportedChannel { .. } => {
                Err(DispatchError::Fatal(app_error(err.to_string())))
            }
            ProviderError::Api { .. } | ProviderError::Transport(_) => {
                Err(DispatchError::Retryable(app_error(err.to_string())))
            }
        }
    }
}

fn build_message(
    id: Uuid,
    service: &ServiceWithPermissions,
    payload: &NotificationPayload,
    recipient: String,
    rendered: RenderedTemplate,
    channel: NotificationType,
) -> OutboundMessage {
    match channel {
        NotificationType::Sms => OutboundMessage::Sms(OutboundSms {
            reference: id.to_string(),
            to: recipient,
            body: rendered.body,
            sender: service.service.sms_sender.clone(),
        }),
        NotificationType::Email => {
            let params = payload.email_parameters.clone().unwrap_or_default();
            OutboundMessage::Email(OutboundEmail {
                reference: id.to_string(),
                from_name: service.service.name.clone(),
                from_local: service.service.email_from.clone(),
                to: recipient,
                subject: rendered.subject.unwrap_or_default(),
                body: rendered.body,
                html_body: rendered.html_body,
                reply_to: service.service.reply_to_email.clone(),
                importance: params.importance,
                cc: params.cc_address,
            })
        }
    }
}
