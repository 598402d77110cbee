//! Sinch XMS batch API client.

use std::sync::LazyLock;

use async_trait::async_trait;
use phonenumber::{Mode, country};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use unicode_normalization::UnicodeNormalization;

use super::provider::{OutboundMessage, ProviderClient, ProviderError, ProviderReference};
use crate::config::SinchConfig;
use crate::error::AppError;
use crate::metrics::ClientRequestTimer;
use crate::models::{NotificationStatus, NotificationType};

pub const SINCH: &str = "sinch";

static PHONE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?\d[\d\s().\-]{5,}\d").expect("phone candidate pattern is valid")
});

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    to: Vec<String>,
    body: String,
    client_reference: &'a str,
    delivery_report: &'static str,
    callback_url: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    text: String,
}

pub struct SinchClient {
    http: reqwest::Client,
    config: SinchConfig,
    callback_host: Option<String>,
    region: country::Id,
}

impl SinchClient {
    pub fn new(
        http: reqwest::Client,
        config: SinchConfig,
        callback_host: Option<String>,
    ) -> Result<Self, AppError> {
        let region = config
            .default_region
            .to_ascii_uppercase()
            .parse::<country::Id>()
            .map_err(|_| AppError::Configuration {
                key: "providers.sinch.default_region".to_string(),
                source: anyhow::anyhow!("unknown region '{}'", config.default_region),
            })?;
        Ok(Self {
            http,
            config,
            callback_host,
            region,
        })
    }

    fn batches_url(&self) -> String {
        format!(
            "{}/xms/v1/{}/batches",
            self.config.base_url.trim_end_matches('/'),
            self.config.service_plan_id
        )
    }

    fn callback_url(&self, reference: &str) -> String {
        match self.callback_host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) => format!(
                "{}/notifications/sms/sinch/{}",
                host.trim_end_matches('/'),
                reference
            ),
            None => String::new(),
        }
    }

    /// First valid number found in free-form input, in E.164.
    fn extract_number(&self, input: &str) -> Option<String> {
        std::iter::once(input.trim())
            .chain(PHONE_CANDIDATE.find_iter(input).map(|m| m.as_str()))
            .filter_map(|candidate| phonenumber::parse(Some(self.region), candidate).ok())
            .find(phonenumber::is_valid)
            .map(|number| number.format().mode(Mode::E164).to_string())
    }
}

#[async_trait]
impl ProviderClient for SinchClient {
    fn identifier(&self) -> &'static str {
        SINCH
    }

    fn channel(&self) -> NotificationType {
        NotificationType::Sms
    }

    fn validate_recipient(&self, to: &str) -> Result<String, ProviderError> {
        self.extract_number(to).ok_or_else(|| {
            ProviderError::InvalidRecipient("No valid numbers found for SMS delivery".to_string())
        })
    }

    async fn send(&self, message: &OutboundMessage) -> Result<ProviderReference, ProviderError> {
        let OutboundMessage::Sms(sms) = message else {
            return Err(ProviderError::UnsupportedChannel {
                provider: SINCH,
                channel: message.channel(),
            });
        };
        let to = self.validate_recipient(&sms.to)?;

        let request = BatchRequest {
            from: sms
                .sender
                .as_deref()
                .or(self.config.default_sender.as_deref()),
            to: vec![to],
            body: sms.body.nfkd().collect(),
            client_reference: &sms.reference,
            delivery_report: "per_recipient",
            callback_url: self.callback_url(&sms.reference),
        };

        let mut timer = ClientRequestTimer::start(SINCH);
        let response = self
            .http
            .post(self.batches_url())
            .bearer_auth(&self.config.api_token)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| error!(reference = %sms.reference, error = %e, "Failed to communicate with Sinch"))?;

        if response.status().is_success() {
            let batch: BatchResponse = response.json().await?;
            timer.succeeded();
            info!(reference = %sms.reference, batch_id = %batch.id, "Sinch send SMS request succeeded");
            return Ok(ProviderReference(batch.id));
        }

        let http_status = response.status();
        let body: ErrorResponse = response.json().await.unwrap_or_default();
        error!(
            reference = %sms.reference,
            status = %http_status,
            code = %body.code,
            "Sinch send SMS request failed"
        );
        if body.code.starts_with("syntax_") {
            Err(ProviderError::Rejected {
                status: NotificationStatus::PermanentFailure,
                code: body.code,
                message: body.text,
            })
        } else {
            Err(ProviderError::Api {
                code: if body.code.is_empty() {
                    http_status.as_u16().to_string()
                } else {
                    body.code
                },
                message: body.text,
            })
        }
    }
}
