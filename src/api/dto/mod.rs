//! Request and response bodies, grouped by endpoint family.

mod callback;
mod error;
mod health;
mod job;
mod keyword;
mod notification;

pub use callback::{
    CallbackAck, KeywordStored, SesNotification, SinchDeliveryReport, SinchKeywordCallback,
    SnsEnvelope,
};
pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use job::{CreateJobRequest, JobResponse};
pub use keyword::{
    KeywordCountQuery, KeywordCountResponse, KeywordListQuery, KeywordListResponse,
    KeywordResponse,
};
pub use notification::{CreateNotificationRequest, NotificationQueuedResponse};
