//! Prometheus metrics for provider calls, tasks and callbacks.
//!
//! Recording goes through the `metrics` facade; when no recorder is installed
//! every call is a no-op, so services never check whether metrics are on.

use std::sync::OnceLock;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::AppError;
use crate::models::StatisticsTag;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Safe to call more than once.
pub fn install() -> Result<PrometheusHandle, AppError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Configuration {
            key: "metrics".to_string(),
            source: anyhow::Error::new(e),
        })?;
    describe();
    let _ = PROMETHEUS_HANDLE.set(handle.clone());
    Ok(handle)
}

pub fn handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

fn describe() {
    metrics::describe_histogram!(
        "clients_request_time_seconds",
        "Wall time of outbound provider requests"
    );
    metrics::describe_counter!("clients_requests_total", "Outbound provider requests by outcome");
    metrics::describe_counter!(
        "notifications_status_total",
        "Notification status changes by provider and status"
    );
    metrics::describe_counter!(
        "inbound_shortnumber_failed_total",
        "Inbound keyword callbacks that could not be routed"
    );
    metrics::describe_counter!(
        "provider_statistics_total",
        "Provider outcomes counted as delivered or failure"
    );
    metrics::describe_counter!(
        "delivery_report_failed_total",
        "Delivery reports that were not applied to a sent notification"
    );
    metrics::describe_counter!("tasks_queued_total", "Tasks handed to the queue");
    metrics::describe_counter!("tasks_finished_total", "Task executions by outcome");
}

/// Times one provider request; records on drop so early returns count too.
pub struct ClientRequestTimer {
    provider: &'static str,
    started: Instant,
    outcome: &'static str,
}

impl ClientRequestTimer {
    pub fn start(provider: &'static str) -> Self {
        Self {
            provider,
            started: Instant::now(),
            outcome: "error",
        }
    }

    pub fn succeeded(&mut self) {
        self.outcome = "success";
    }
}

impl Drop for ClientRequestTimer {
    fn drop(&mut self) {
        metrics::histogram!("clients_request_time_seconds", "provider" => self.provider)
            .record(self.started.elapsed().as_secs_f64());
        metrics::counter!(
            "clients_requests_total",
            "provider" => self.provider,
            "outcome" => self.outcome
        )
        .increment(1);
    }
}

pub fn record_status(provider: &str, status: &str) {
    metrics::counter!(
        "notifications_status_total",
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_inbound_failure(provider: &str) {
    metrics::counter!("inbound_shortnumber_failed_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_statistics(provider: &str, tag: StatisticsTag) {
    metrics::counter!(
        "provider_statistics_total",
        "provider" => provider.to_string(),
        "tag" => tag.as_str()
    )
    .increment(1);
}

pub fn record_delivery_report_failure(provider: &str, reason: &'static str) {
    metrics::counter!(
        "delivery_report_failed_total",
        "provider" => provider.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_task_queued(task_type: &str) {
    metrics::counter!("tasks_queued_total", "task" => task_type.to_string()).increment(1);
}

pub fn record_task_finished(task_type: &str, outcome: &'static str) {
    metrics::counter!(
        "tasks_finished_total",
        "task" => task_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Value of the rendered sample of `name` carrying every label in `labels`.
#[cfg(test)]
pub(crate) fn sample_value(rendered: &str, name: &str, labels: &[&str]) -> Option<f64> {
    rendered
        .lines()
        .filter(|line| line.starts_with(&format!("{name}{{")))
        .find(|line| labels.iter().all(|label| line.contains(label)))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
