use std::time::Duration;

use crate::error::AppError;

/// Builds the HTTP client shared by every provider integration.
///
/// One client per process keeps connection pools warm across sends; requests
/// time out after `timeout`, connection attempts after `connect_timeout`.
pub fn build_http_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .http2_adaptive_window(true)
        .gzip(true)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Configuration {
            key: "providers.http".to_string(),
            source: anyhow::Error::new(e),
        })
}
