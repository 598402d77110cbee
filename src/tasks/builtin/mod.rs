mod deliver_notification;
mod process_job;
mod sweep_inbound_keywords;

pub use deliver_notification::DeliverNotificationTask;
pub use process_job::ProcessJobTask;
pub use sweep_inbound_keywords::SweepInboundKeywordsTask;
