mod inbound;
mod job;
mod notification;
mod provider;
mod service;
mod template;

pub use inbound::{InboundShortNumber, InboundSmsKeyword, NewInboundShortNumber};
pub use job::{Job, JobRecipient, JobStatus, NewJob};
pub use notification::{
    EmailParameters, NewNotification, Notification, NotificationPayload, NotificationStatus,
    NotificationStatusUpdate, StatisticsTag,
};
pub use provider::{
    NewProviderDetail, NotificationType, ProviderDetail, ProviderDetailChanges,
    ProviderDetailHistory,
};
pub use service::{
    EMAIL_PERMISSION, INBOUND_SMS_KEYWORD_PERMISSION, INBOUND_SMS_PERMISSION, SMS_PERMISSION,
    Service, ServiceDataRetention, ServicePermission, ServiceSafelistEntry, ServiceWithPermissions,
};
pub use template::{RenderedTemplate, Template};
