//! Reconciles provider callbacks with stored state: keyword messages received
//! on short numbers, and delivery reports for sent notifications.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::metrics;
use crate::models::{InboundSmsKeyword, Notification, NotificationStatus, NotificationStatusUpdate};
use crate::repositories::Repositories;
use crate::services::notifications::{ProviderResponse, SesEventType, SinchStatus};

/// A keyword message as posted by the provider, already validated.
#[derive(Debug, Clone)]
pub struct InboundKeywordMessage {
    pub provider: &'static str,
    pub provider_reference: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeywordOutcome {
    Stored(InboundSmsKeyword),
    /// No service owns the number, or the owner may not receive keywords.
    Unroutable,
}

#[derive(Debug, Clone)]
pub enum DeliveryReportOutcome {
    Updated(Notification),
    UnknownNotification,
    /// The row exists but the report does not apply to it.
    Ignored { current: NotificationStatus },
}

#[derive(Clone)]
pub struct CallbackReconciler {
    repos: Repositories,
}

impl CallbackReconciler {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn receive_keyword(&self, message: InboundKeywordMessage) -> AppResult<KeywordOutcome> {
        let provider = message.provider;
        let service = self
            .repos
            .services
            .find_by_inbound_short_number(&message.to)
            .await?;

        let service = match service {
            Some(service) if service.accepts_inbound_keywords() => service,
            Some(service) => {
                error!(
                    provider,
                    short_number = %message.to,
                    service_id = %service.service.id,
                    "Inbound keyword for a service without inbound keyword permissions"
                );
                metrics::record_inbound_failure(provider);
                return Ok(KeywordOutcome::Unroutable);
            }
            None => {
                error!(provider, short_number = %message.to, "Inbound keyword for an unbound short number");
                metrics::record_inbound_failure(provider);
                return Ok(KeywordOutcome::Unroutable);
            }
        };

        let keyword = self
            .repos
            .keywords
            .create(InboundSmsKeyword {
                id: Uuid::new_v4(),
                service_id: service.service.id,
                content: message.body,
                notify_short_number: message.to,
                user_number: message.from,
                created_at: Utc::now(),
                provider_date: Some(message.received_at),
                provider_reference: Some(message.provider_reference),
                provider: provider.to_string(),
            })
            .await?;

        info!(
            keyword_id = %keyword.id,
            service_id = %keyword.service_id,
            provider,
            "Inbound keyword stored"
        );
        Ok(KeywordOutcome::Stored(keyword))
    }

    /// Sinch reports carry our notification id in the callback path and the
    /// batch id we stored as reference.
    pub async fn apply_sinch_report(
        &self,
        notification_id: Uuid,
        batch_id: &str,
        status: &str,
    ) -> AppResult<DeliveryReportOutcome> {
        let Some(notification) = self.repos.notifications.find_by_id(notification_id).await? else {
            return Ok(self.unknown("sinch", &notification_id.to_string()));
        };
        if notification.reference.as_deref().is_some_and(|r| r != batch_id) {
            warn!(
                %notification_id,
                batch_id,
                reference = ?notification.reference,
                "Delivery report batch does not match notification reference"
            );
            metrics::record_delivery_report_failure("sinch", "batch_mismatch");
            return Ok(DeliveryReportOutcome::Ignored {
                current: notification.status,
            });
        }
        self.apply(notification, ProviderResponse::Sinch(SinchStatus::parse(status)))
            .await
    }

    pub async fn apply_ses_event(
        &self,
        reference: &str,
        event: SesEventType,
    ) -> AppResult<DeliveryReportOutcome> {
        let Some(notification) = self.repos.notifications.find_by_reference(reference).await? else {
            return Ok(self.unknown("ses", reference));
        };
        self.apply(notification, ProviderResponse::Ses(event)).await
    }

    fn unknown(&self, provider: &'static str, key: &str) -> DeliveryReportOutcome {
        warn!(provider, key, "Delivery report for unknown notification");
        metrics::record_delivery_report_failure(provider, "unknown_notification");
        DeliveryReportOutcome::UnknownNotification
    }

    async fn apply(
        &self,
        notification: Notification,
        response: ProviderResponse,
    ) -> AppResult<DeliveryReportOutcome> {
        let provider = response.provider();
        let classification = response.classify();
        let target = classification.status;

        let updated = self
            .repos
            .notifications
            .transition(
                notification.id,
                target.allowed_predecessors(),
                NotificationStatusUpdate::status(target),
            )
            .await?;

        match updated {
            Some(row) => {
                metrics::record_status(provider, target.as_str());
                if let Some(tag) = classification.statistics {
                    metrics::record_statistics(provider, tag);
                }
                if classification.success {
                    info!(
                        notification_id = %row.id,
                        provider,
                        from = %notification.status,
                        to = %target,
                        detail = classification.message,
                        "Delivery report applied"
                    );
                } else {
                    warn!(
                        notification_id = %row.id,
                        provider,
                        from = %notification.status,
                        to = %target,
                        detail = classification.message,
                        "Delivery report applied, notification failed"
                    );
                }
                Ok(DeliveryReportOutcome::Updated(row))
            }
            None => {
                info!(
                    notification_id = %notification.id,
                    provider,
                    current = %notification.status,
                    reported = %target,
                    "Delivery report does not apply to current status"
                );
                Ok(DeliveryReportOutcome::Ignored {
                    current: notification.status,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use metrics_exporter_prometheus::PrometheusBuilder;

    use crate::metrics::sample_value;
    use crate::models::{
        INBOUND_SMS_KEYWORD_PERMISSION, NewInboundShortNumber, NotificationType, SMS_PERMISSION,
    };
    use crate::repositories::memory::MemoryStore;
    use crate::repositories::ShortNumberStore;

    fn reconciler() -> (Arc<MemoryStore>, CallbackReconciler) {
        let store = Arc::new(MemoryStore::new());
        let reconciler = CallbackReconciler::new(Repositories::memory(store.clone()));
        (store, reconciler)
    }

    async fn bind_number(store: &MemoryStore, permissions: &[&str]) -> Uuid {
        let service = store.add_service(false, 100, permissions);
        let number = ShortNumberStore::create(
            store,
            NewInboundShortNumber {
                id: Uuid::new_v4(),
                short_number: "555123".into(),
                provider: "sinch".into(),
                service_id: None,
                active: true,
            },
        )
        .await
        .unwrap();
        store.allocate(number.id, service.id).await.unwrap();
        service.id
    }

    fn keyword(to: &str) -> InboundKeywordMessage {
        InboundKeywordMessage {
            provider: "sinch",
            provider_reference: "01FC66621XXXXX119Z8PMV1QPQ".into(),
            from: "+16502530000".into(),
            to: to.into(),
            body: "STOP".into(),
            received_at: Utc::now(),
        }
    }

    fn notification(store: &MemoryStore, status: NotificationStatus, reference: &str) -> Notification {
        let service = store.add_service(false, 100, &[SMS_PERMISSION]);
        let row = Notification {
            id: Uuid::new_v4(),
            service_id: service.id,
            template_id: Uuid::new_v4(),
            template_version: 1,
            notification_type: NotificationType::Sms,
            to: "+16502530000".into(),
            personalisation: None,
            status,
            sent_by: Some("sinch".into()),
            reference: Some(reference.into()),
            created_at: Utc::now(),
            sent_at: Some(Utc::now()),
            updated_at: None,
            job_id: None,
            job_row_number: None,
            additional_email_parameters: None,
        };
        store.insert_notification(row.clone());
        row
    }

    #[tokio::test]
    async fn test_keyword_stored_for_permitted_service() {
        let (store, reconciler) = reconciler();
        let service_id = bind_number(&store, &[SMS_PERMISSION, INBOUND_SMS_KEYWORD_PERMISSION]).await;

        let outcome = reconciler.receive_keyword(keyword("555123")).await.unwrap();
        let KeywordOutcome::Stored(stored) = outcome else {
            panic!("expected keyword to be stored");
        };
        assert_eq!(stored.service_id, service_id);
        assert_eq!(stored.user_number, "+16502530000");
        assert_eq!(store.keywords().len(), 1);
    }

    #[tokio::test]
    async fn test_unbound_number_is_acknowledged_without_storing() {
        let (store, reconciler) = reconciler();
        let outcome = reconciler.receive_keyword(keyword("999999")).await.unwrap();
        assert_eq!(outcome, KeywordOutcome::Unroutable);
        assert!(store.keywords().is_empty());
    }

    #[tokio::test]
    async fn test_service_without_keyword_permission_is_unroutable() {
        let (store, reconciler) = reconciler();
        bind_number(&store, &[SMS_PERMISSION]).await;
        let outcome = reconciler.receive_keyword(keyword("555123")).await.unwrap();
        assert_eq!(outcome, KeywordOutcome::Unroutable);
        assert!(store.keywords().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_report_is_terminal() {
        let (store, reconciler) = reconciler();
        let row = notification(&store, NotificationStatus::Sending, "batch-1");

        let outcome = reconciler
            .apply_sinch_report(row.id, "batch-1", "Failed")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            DeliveryReportOutcome::Updated(ref n) if n.status == NotificationStatus::PermanentFailure
        ));

        // A late Dispatched report must never move the row back to created.
        let outcome = reconciler
            .apply_sinch_report(row.id, "batch-1", "Dispatched")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            DeliveryReportOutcome::Ignored {
                current: NotificationStatus::PermanentFailure
            }
        ));
        assert_eq!(
            store.notifications()[0].status,
            NotificationStatus::PermanentFailure
        );
    }

    #[tokio::test]
    async fn test_mismatched_batch_is_ignored() {
        let (store, reconciler) = reconciler();
        let row = notification(&store, NotificationStatus::Sending, "batch-1");
        let outcome = reconciler
            .apply_sinch_report(row.id, "batch-2", "Delivered")
            .await
            .unwrap();
        assert!(matches!(outcome, DeliveryReportOutcome::Ignored { .. }));
        assert_eq!(store.notifications()[0].status, NotificationStatus::Sending);
    }

    #[tokio::test]
    async fn test_unknown_notification_is_acknowledged() {
        let (_, reconciler) = reconciler();
        let outcome = reconciler
            .apply_sinch_report(Uuid::new_v4(), "batch-1", "Delivered")
            .await
            .unwrap();
        assert!(matches!(outcome, DeliveryReportOutcome::UnknownNotification));
    }

    #[tokio::test]
    async fn test_soft_bounce_then_delivery() {
        let (store, reconciler) = reconciler();
        notification(&store, NotificationStatus::Sending, "ses-msg-1");

        reconciler
            .apply_ses_event("ses-msg-1", SesEventType::Temporary)
            .await
            .unwrap();
        assert_eq!(
            store.notifications()[0].status,
            NotificationStatus::TemporaryFailure
        );

        reconciler
            .apply_ses_event("ses-msg-1", SesEventType::Delivery)
            .await
            .unwrap();
        assert_eq!(store.notifications()[0].status, NotificationStatus::Delivered);
    }

    #[tokio::test]
    async fn test_reports_feed_provider_statistics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let (store, reconciler) = reconciler();
        let delivered = notification(&store, NotificationStatus::Sending, "batch-1");
        let failed = notification(&store, NotificationStatus::Sending, "batch-2");
        reconciler
            .apply_sinch_report(delivered.id, "batch-1", "Delivered")
            .await
            .unwrap();
        reconciler
            .apply_sinch_report(failed.id, "batch-2", "Expired")
            .await
            .unwrap();
        // Still in flight: no statistics outcome yet.
        let queued = notification(&store, NotificationStatus::Created, "batch-3");
        reconciler
            .apply_sinch_report(queued.id, "batch-3", "Queued")
            .await
            .unwrap();

        let rendered = handle.render();
        let sinch = "provider=\"sinch\"";
        assert_eq!(
            sample_value(&rendered, "provider_statistics_total", &[sinch, "tag=\"delivered\""]),
            Some(1.0)
        );
        assert_eq!(
            sample_value(&rendered, "provider_statistics_total", &[sinch, "tag=\"failure\""]),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_unmatched_reports_use_their_own_counter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let (store, reconciler) = reconciler();
        let row = notification(&store, NotificationStatus::Sending, "batch-1");
        reconciler
            .apply_sinch_report(row.id, "batch-2", "Delivered")
            .await
            .unwrap();
        reconciler
            .apply_ses_event("ses-missing", SesEventType::Delivery)
            .await
            .unwrap();

        let rendered = handle.render();
        assert_eq!(
            sample_value(
                &rendered,
                "delivery_report_failed_total",
                &["provider=\"sinch\"", "reason=\"batch_mismatch\""]
            ),
            Some(1.0)
        );
        assert_eq!(
            sample_value(
                &rendered,
                "delivery_report_failed_total",
                &["provider=\"ses\"", "reason=\"unknown_notification\""]
            ),
            Some(1.0)
        );
        assert!(!rendered.contains("inbound_shortnumber_failed_total"));
    }
}
