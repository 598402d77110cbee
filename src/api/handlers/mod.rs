//! HTTP request handlers, one module per endpoint family.

pub mod callbacks;
pub mod health;
pub mod jobs;
pub mod keywords;
pub mod metrics;
pub mod notifications;
