//! In-memory store used by service tests.
//!
//! Mirrors the constraints the Postgres schema enforces (unique short
//! numbers, one short number per service, guarded status updates).

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::repositories::{
    JobStore, KeywordQuery, KeywordStore, NotificationStore, ProviderStore, RetentionScope,
    ServiceStore, ShortNumberStore, TemplateStore,
};

#[derive(Default)]
struct State {
    providers: Vec<ProviderDetail>,
    provider_history: Vec<ProviderDetailHistory>,
    notifications: HashMap<Uuid, Notification>,
    services: Vec<ServiceWithPermissions>,
    safelist: Vec<ServiceSafelistEntry>,
    retention: Vec<ServiceDataRetention>,
    templates: Vec<Template>,
    jobs: HashMap<Uuid, Job>,
    short_numbers: Vec<InboundShortNumber>,
    keywords: Vec<InboundSmsKeyword>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Makes `NotificationStore::create` fail like an unavailable database.
    pub fail_notification_create: AtomicBool,
    /// Makes transitions that record a provider reference fail.
    pub fail_acknowledgement: AtomicBool,
}

fn storage_down(operation: &str) -> AppError {
    AppError::Database {
        operation: operation.to_string(),
        source: anyhow::anyhow!("database unavailable"),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        f(&mut state)
    }

    pub fn add_provider(
        &self,
        identifier: &str,
        channel: NotificationType,
        priority: i32,
        active: bool,
    ) -> ProviderDetail {
        let detail = ProviderDetail {
            id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            display_name: identifier.to_uppercase(),
            notification_type: channel,
            priority,
            active,
            version: 1,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.with(|s| s.providers.push(detail.clone()));
        detail
    }

    pub fn add_service(&self, restricted: bool, message_limit: i64, permissions: &[&str]) -> Service {
        let service = Service {
            id: Uuid::new_v4(),
            name: format!("service-{}", Uuid::new_v4().simple()),
            active: true,
            restricted,
            message_limit,
            email_from: "notify.service".to_string(),
            sms_sender: Some("12345".to_string()),
            reply_to_email: None,
            created_at: Utc::now(),
        };
        self.with(|s| {
            s.services.push(ServiceWithPermissions {
                service: service.clone(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            })
        });
        service
    }

    pub fn add_safelist(&self, service_id: Uuid, kind: NotificationType, recipient: &str) {
        self.with(|s| {
            s.safelist.push(ServiceSafelistEntry {
                id: Uuid::new_v4(),
                service_id,
                recipient_type: kind,
                recipient: recipient.to_string(),
                created_at: Utc::now(),
            })
        });
    }

    pub fn add_retention(&self, service_id: Uuid, kind: NotificationType, days: i32) {
        self.with(|s| {
            s.retention.push(ServiceDataRetention {
                id: Uuid::new_v4(),
                service_id,
                notification_type: kind,
                days_of_retention: days,
                created_at: Utc::now(),
                updated_at: None,
            })
        });
    }

    pub fn add_template(&self, service_id: Uuid, kind: NotificationType, content: &str) -> Template {
        let template = Template {
            id: Uuid::new_v4(),
            version: 1,
            service_id,
            name: "template".to_string(),
            template_type: kind,
            subject: matches!(kind, NotificationType::Email).then(|| "Subject ((name))".to_string()),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.with(|s| s.templates.push(template.clone()));
        template
    }

    pub fn insert_job(&self, job: Job) {
        self.with(|s| s.jobs.insert(job.id, job));
    }

    pub fn insert_notification(&self, notification: Notification) {
        self.with(|s| s.notifications.insert(notification.id, notification));
    }

    pub fn insert_keyword(&self, keyword: InboundSmsKeyword) {
        self.with(|s| s.keywords.push(keyword));
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.with(|s| s.notifications.values().cloned().collect())
    }

    pub fn keywords(&self) -> Vec<InboundSmsKeyword> {
        self.with(|s| s.keywords.clone())
    }

    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.with(|s| s.jobs.get(&id).cloned())
    }

    pub fn provider_history(&self) -> Vec<ProviderDetailHistory> {
        self.with(|s| s.provider_history.clone())
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn list(&self, channel: Option<NotificationType>) -> AppResult<Vec<ProviderDetail>> {
        let mut found: Vec<ProviderDetail> = self.with(|s| {
            s.providers
                .iter()
                .filter(|p| channel.is_none_or(|c| p.notification_type == c))
                .cloned()
                .collect()
        });
        found.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.identifier.cmp(&b.identifier)));
        Ok(found)
    }

    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<ProviderDetail>> {
        Ok(self.with(|s| s.providers.iter().find(|p| p.identifier == identifier).cloned()))
    }

    async fn update(
        &self,
        identifier: &str,
        changes: ProviderDetailChanges,
    ) -> AppResult<ProviderDetail> {
        self.with(|s| {
            let detail = s
                .providers
                .iter_mut()
                .find(|p| p.identifier == identifier)
                .ok_or_else(|| AppError::not_found("ProviderDetail", "identifier", identifier))?;
            if let Some(priority) = changes.priority {
                detail.priority = priority;
            }
            if let Some(active) = changes.active {
                detail.active = active;
            }
            detail.version += 1;
            detail.updated_at = Some(Utc::now());
            let updated = detail.clone();
            s.provider_history.push(ProviderDetailHistory::from(&updated));
            Ok(updated)
        })
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, new: NewNotification) -> AppResult<Notification> {
        if self.fail_notification_create.load(Ordering::SeqCst) {
            return Err(storage_down("insert notification"));
        }
        let notification = Notification {
            id: new.id,
            service_id: new.service_id,
            template_id: new.template_id,
            template_version: new.template_version,
            notification_type: new.notification_type,
            to: new.to,
            personalisation: new.personalisation,
            status: new.status,
            sent_by: None,
            reference: None,
            created_at: new.created_at,
            sent_at: None,
            updated_at: None,
            job_id: new.job_id,
            job_row_number: new.job_row_number,
            additional_email_parameters: new.additional_email_parameters,
        };
        self.with(|s| {
            if s.notifications.contains_key(&notification.id) {
                return Err(AppError::Duplicate {
                    entity: "notifications".into(),
                    field: "id".into(),
                    value: notification.id.to_string(),
                });
            }
            s.notifications.insert(notification.id, notification.clone());
            Ok(notification)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Notification>> {
        Ok(self.with(|s| s.notifications.get(&id).cloned()))
    }

    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<Notification>> {
        Ok(self.with(|s| {
            s.notifications
                .values()
                .find(|n| n.reference.as_deref() == Some(reference))
                .cloned()
        }))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: &[NotificationStatus],
        update: NotificationStatusUpdate,
    ) -> AppResult<Option<Notification>> {
        if update.reference.is_some() && self.fail_acknowledgement.load(Ordering::SeqCst) {
            return Err(storage_down("update notification"));
        }
        Ok(self.with(|s| {
            let row = s.notifications.get_mut(&id)?;
            if !from.contains(&row.status) {
                return None;
            }
            if let Some(status) = update.status {
                row.status = status;
            }
            if update.sent_by.is_some() {
                row.sent_by = update.sent_by;
            }
            if update.reference.is_some() {
                row.reference = update.reference;
            }
            if update.sent_at.is_some() {
                row.sent_at = update.sent_at;
            }
            row.updated_at = update.updated_at.or(Some(Utc::now()));
            Some(row.clone())
        }))
    }

    async fn count_for_service_since(&self, service_id: Uuid, since: DateTime<Utc>) -> AppResult<i64> {
        Ok(self.with(|s| {
            s.notifications
                .values()
                .filter(|n| n.service_id == service_id && n.created_at >= since)
                .count() as i64
        }))
    }
}

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn find_with_permissions(&self, id: Uuid) -> AppResult<Option<ServiceWithPermissions>> {
        Ok(self.with(|s| s.services.iter().find(|svc| svc.service.id == id).cloned()))
    }

    async fn find_by_inbound_short_number(
        &self,
        short_number: &str,
    ) -> AppResult<Option<ServiceWithPermissions>> {
        Ok(self.with(|s| {
            let owner = s
                .short_numbers
                .iter()
                .find(|n| n.short_number == short_number && n.active)
                .and_then(|n| n.service_id)?;
            s.services.iter().find(|svc| svc.service.id == owner).cloned()
        }))
    }

    async fn safelist(&self, service_id: Uuid) -> AppResult<Vec<ServiceSafelistEntry>> {
        Ok(self.with(|s| {
            s.safelist
                .iter()
                .filter(|e| e.service_id == service_id)
                .cloned()
                .collect()
        }))
    }

    async fn data_retention_for(
        &self,
        notification_type: NotificationType,
    ) -> AppResult<Vec<ServiceDataRetention>> {
        Ok(self.with(|s| {
            s.retention
                .iter()
                .filter(|r| r.notification_type == notification_type)
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn find(&self, id: Uuid, version: i32) -> AppResult<Option<Template>> {
        Ok(self.with(|s| {
            s.templates
                .iter()
                .find(|t| t.id == id && t.version == version)
                .cloned()
        }))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, new: NewJob) -> AppResult<Job> {
        let job = Job {
            id: new.id,
            service_id: new.service_id,
            template_id: new.template_id,
            template_version: new.template_version,
            notification_count: new.notification_count,
            job_status: new.job_status,
            recipients: new.recipients,
            created_at: Utc::now(),
            processing_started: None,
            processing_finished: None,
        };
        self.with(|s| s.jobs.insert(job.id, job.clone()));
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.job(id))
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> AppResult<Job> {
        self.with(|s| {
            let job = s
                .jobs
                .get_mut(&id)
                .ok_or_else(|| AppError::not_found("Job", "id", id))?;
            job.job_status = status;
            match status {
                JobStatus::InProgress => job.processing_started = Some(Utc::now()),
                JobStatus::Pending => {}
                _ => job.processing_finished = Some(Utc::now()),
            }
            Ok(job.clone())
        })
    }
}

#[async_trait]
impl ShortNumberStore for MemoryStore {
    async fn list_all(&self) -> AppResult<Vec<InboundShortNumber>> {
        let mut all = self.with(|s| s.short_numbers.clone());
        all.sort_by_key(|n| n.updated_at);
        Ok(all)
    }

    async fn list_available(&self) -> AppResult<Vec<InboundShortNumber>> {
        Ok(self.with(|s| {
            s.short_numbers
                .iter()
                .filter(|n| n.is_available())
                .cloned()
                .collect()
        }))
    }

    async fn find_for_service(&self, service_id: Uuid) -> AppResult<Option<InboundShortNumber>> {
        Ok(self.with(|s| {
            s.short_numbers
                .iter()
                .find(|n| n.service_id == Some(service_id))
                .cloned()
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InboundShortNumber>> {
        Ok(self.with(|s| s.short_numbers.iter().find(|n| n.id == id).cloned()))
    }

    async fn allocate(&self, id: Uuid, service_id: Uuid) -> AppResult<Option<InboundShortNumber>> {
        self.with(|s| {
            if s.short_numbers.iter().any(|n| n.service_id == Some(service_id)) {
                return Err(AppError::Duplicate {
                    entity: "inbound_shortnumbers".into(),
                    field: "service_id".into(),
                    value: service_id.to_string(),
                });
            }
            Ok(s.short_numbers
                .iter_mut()
                .find(|n| n.id == id && n.is_available())
                .map(|n| {
                    n.service_id = Some(service_id);
                    n.updated_at = Some(Utc::now());
                    n.clone()
                }))
        })
    }

    async fn set_active_for_service(
        &self,
        service_id: Uuid,
        active: bool,
    ) -> AppResult<Option<InboundShortNumber>> {
        Ok(self.with(|s| {
            s.short_numbers
                .iter_mut()
                .find(|n| n.service_id == Some(service_id))
                .map(|n| {
                    n.active = active;
                    n.updated_at = Some(Utc::now());
                    n.clone()
                })
        }))
    }

    async fn create(&self, new: NewInboundShortNumber) -> AppResult<InboundShortNumber> {
        self.with(|s| {
            if s.short_numbers.iter().any(|n| n.short_number == new.short_number) {
                return Err(AppError::Duplicate {
                    entity: "inbound_shortnumbers".into(),
                    field: "short_number".into(),
                    value: new.short_number.clone(),
                });
            }
            let number = InboundShortNumber {
                id: new.id,
                short_number: new.short_number,
                provider: new.provider,
                service_id: new.service_id,
                active: new.active,
                created_at: Utc::now(),
                updated_at: None,
            };
            s.short_numbers.push(number.clone());
            Ok(number)
        })
    }
}

#[async_trait]
impl KeywordStore for MemoryStore {
    async fn create(&self, keyword: InboundSmsKeyword) -> AppResult<InboundSmsKeyword> {
        self.insert_keyword(keyword.clone());
        Ok(keyword)
    }

    async fn list(&self, query: KeywordQuery) -> AppResult<Vec<InboundSmsKeyword>> {
        let mut found: Vec<InboundSmsKeyword> = self.with(|s| {
            s.keywords
                .iter()
                .filter(|k| k.service_id == query.service_id)
                .filter(|k| query.user_number.as_ref().is_none_or(|u| &k.user_number == u))
                .filter(|k| query.since.is_none_or(|since| k.created_at >= since))
                .cloned()
                .collect()
        });
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn count_for_service(&self, service_id: Uuid, since: DateTime<Utc>) -> AppResult<i64> {
        Ok(self.with(|s| {
            s.keywords
                .iter()
                .filter(|k| k.service_id == service_id && k.created_at >= since)
                .count() as i64
        }))
    }

    async fn find_by_id_and_service(
        &self,
        id: Uuid,
        service_id: Uuid,
    ) -> AppResult<Option<InboundSmsKeyword>> {
        Ok(self.with(|s| {
            s.keywords
                .iter()
                .find(|k| k.id == id && k.service_id == service_id)
                .cloned()
        }))
    }

    async fn delete_batch(
        &self,
        scope: &RetentionScope,
        cutoff: DateTime<Utc>,
        batch_size: i64,
    ) -> AppResult<usize> {
        Ok(self.with(|s| {
            let in_scope = |k: &InboundSmsKeyword| match scope {
                RetentionScope::Service(id) => k.service_id == *id,
                RetentionScope::AllExcept(excluded) => !excluded.contains(&k.service_id),
            };
            let doomed: Vec<Uuid> = s
                .keywords
                .iter()
                .filter(|k| k.created_at < cutoff && in_scope(k))
                .take(batch_size.max(0) as usize)
                .map(|k| k.id)
                .collect();
            s.keywords.retain(|k| !doomed.contains(&k.id));
            doomed.len()
        }))
    }
}
