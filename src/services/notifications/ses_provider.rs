//! Amazon SES client using the `SendRawEmail` query API.

use std::time::SystemTime;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use lettre::Message;
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use serde::Deserialize;
use tracing::{error, info};
use unicode_normalization::UnicodeNormalization;
use url::Url;

use super::provider::{
    OutboundEmail, OutboundMessage, ProviderClient, ProviderError, ProviderReference,
};
use crate::config::SesConfig;
use crate::error::AppError;
use crate::external::SigV4Signer;
use crate::metrics::ClientRequestTimer;
use crate::models::{NotificationStatus, NotificationType};

pub const SES: &str = "ses";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendRawEmailResponse {
    send_raw_email_result: SendRawEmailResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendRawEmailResult {
    message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

macro_rules! raw_header {
    ($name:ident, $header:literal) => {
        #[derive(Debug, Clone)]
        struct $name(String);

        impl Header for $name {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($header)
            }

            fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                Ok(Self(s.to_string()))
            }

            // Values are plain ASCII tokens and must not be folded.
            fn display(&self) -> HeaderValue {
                HeaderValue::dangerous_new_pre_encoded(Self::name(), self.0.clone(), self.0.clone())
            }
        }
    };
}

raw_header!(SesSourceArn, "X-SES-SOURCE-ARN");
raw_header!(SesFromArn, "X-SES-FROM-ARN");
raw_header!(Importance, "importance");

/// Punycodes the domain of an address; the local part is left untouched.
pub fn punycode_encode_email(address: &str) -> Result<String, ProviderError> {
    let (local, domain) = address
        .trim()
        .rsplit_once('@')
        .ok_or_else(|| ProviderError::InvalidRecipient(format!("'{address}' is not an email address")))?;
    let ascii = idna::domain_to_ascii(domain)
        .map_err(|_| ProviderError::InvalidRecipient(format!("invalid domain in '{address}'")))?;
    Ok(format!("{local}@{ascii}"))
}

fn mailbox(address: &str) -> Result<Mailbox, ProviderError> {
    punycode_encode_email(address)?
        .parse::<Mailbox>()
        .map_err(|e| ProviderError::InvalidRecipient(format!("'{address}': {e}")))
}

pub struct SesClient {
    http: reqwest::Client,
    config: SesConfig,
    signer: SigV4Signer,
    endpoint: Url,
}

impl SesClient {
    pub fn new(http: reqwest::Client, config: SesConfig) -> Result<Self, AppError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://email.{}.amazonaws.com/", config.region));
        let endpoint = Url::parse(&endpoint).map_err(|e| AppError::Configuration {
            key: "providers.ses.endpoint".to_string(),
            source: anyhow::Error::new(e),
        })?;
        let signer = SigV4Signer::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.session_token.clone(),
            config.region.clone(),
            "ses",
        );
        Ok(Self {
            http,
            config,
            signer,
            endpoint,
        })
    }

    fn source_arn(&self) -> Option<String> {
        self.config
            .owner_account
            .as_deref()
            .filter(|account| !account.is_empty())
            .map(|account| {
                format!(
                    "arn:aws:ses:{}:{}:identity/{}",
                    self.config.region, account, self.config.sending_domain
                )
            })
    }

    /// NFKD-normalized `"Name" <local@domain>` source and its parsed mailbox.
    fn source(&self, email: &OutboundEmail) -> Result<(String, Mailbox), ProviderError> {
        let source: String = format!(
            "\"{}\" <{}@{}>",
            email.from_name, email.from_local, self.config.sending_domain
        )
        .nfkd()
        .collect();

        let (friendly, address) = source.split_once('<').unwrap_or(("", source.as_str()));
        let friendly = friendly.replace('"', "");
        let address = address
            .trim_end_matches('>')
            .parse()
            .map_err(|e| ProviderError::Api {
                code: "InvalidSource".to_string(),
                message: format!("{e}"),
            })?;
        let name = Some(friendly.trim().to_string()).filter(|n| !n.is_empty());
        Ok((source.clone(), Mailbox::new(name, address)))
    }

    /// Renders the raw MIME message submitted to SES.
    pub fn build_mime(&self, email: &OutboundEmail) -> Result<Vec<u8>, ProviderError> {
        let (_, from) = self.source(email)?;
        let mut builder = Message::builder()
            .from(from)
            .to(mailbox(&email.to)?)
            .subject(email.subject.as_str());

        if let Some(arn) = self.source_arn() {
            builder = builder
                .header(SesSourceArn(arn.clone()))
                .header(SesFromArn(arn));
        }
        if let Some(importance) = email.importance.as_deref().filter(|v| !v.is_empty()) {
            builder = builder.header(Importance(importance.to_string()));
        }
        if let Some(cc) = email.cc.as_deref().filter(|v| !v.is_empty()) {
            builder = builder.cc(mailbox(cc)?);
        }
        if let Some(reply_to) = email.reply_to.as_deref().filter(|v| !v.is_empty()) {
            builder = builder.reply_to(mailbox(reply_to)?);
        }

        let plain = SinglePart::plain(email.body.clone());
        let body = match email.html_body.as_deref().filter(|h| !h.is_empty()) {
            Some(html) => MultiPart::alternative()
                .singlepart(plain)
                .singlepart(SinglePart::html(html.to_string())),
            None => MultiPart::mixed().singlepart(plain),
        };

        let message = builder.multipart(body).map_err(|e| ProviderError::Api {
            code: "MessageBuild".to_string(),
            message: e.to_string(),
        })?;
        Ok(message.formatted())
    }

    /// Unparseable error bodies keep the HTTP status as their code.
    fn classify_error(status: reqwest::StatusCode, body: &str, to: &str) -> ProviderError {
        let (code, message) = match quick_xml::de::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse { error }) => (error.code, error.message),
            Err(_) => (status.as_u16().to_string(), String::new()),
        };
        match code.as_str() {
            "InvalidParameterValue" => ProviderError::InvalidRecipient(format!(
                "email: \"{to}\" message: \"{message}\""
            )),
            "MessageRejected" => ProviderError::Rejected {
                status: NotificationStatus::PermanentFailure,
                code,
                message,
            },
            _ => ProviderError::Api { code, message },
        }
    }
}

#[async_trait]
impl ProviderClient for SesClient {
    fn identifier(&self) -> &'static str {
        SES
    }

    fn channel(&self) -> NotificationType {
        NotificationType::Email
    }

    fn validate_recipient(&self, to: &str) -> Result<String, ProviderError> {
        let encoded = punycode_encode_email(to)?;
        encoded
            .parse::<lettre::Address>()
            .map_err(|e| ProviderError::InvalidRecipient(format!("'{to}': {e}")))?;
        Ok(to.trim().to_string())
    }

    async fn send(&self, message: &OutboundMessage) -> Result<ProviderReference, ProviderError> {
        let OutboundMessage::Email(email) = message else {
            return Err(ProviderError::UnsupportedChannel {
                provider: SES,
                channel: message.channel(),
            });
        };
        let (source, _) = self.source(email)?;
        let raw = self.build_mime(email)?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "SendRawEmail")
            .append_pair("Version", "2010-12-01")
            .append_pair("Source", &source)
            .append_pair("RawMessage.Data", &BASE64.encode(&raw))
            .finish();
        let signed = self
            .signer
            .sign_post(&self.endpoint, FORM_CONTENT_TYPE, body.as_bytes(), SystemTime::now())
            .map_err(|e| ProviderError::Api {
                code: "SigningFailed".to_string(),
                message: e.to_string(),
            })?;

        let mut timer = ClientRequestTimer::start(SES);
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE);
        for (name, value) in &signed {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .body(body)
            .send()
            .await
            .inspect_err(|e| error!(reference = %email.reference, error = %e, "AWS SES request failed"))?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            let parsed: SendRawEmailResponse = quick_xml::de::from_str(&text).map_err(|e| {
                ProviderError::Transport(format!("SES response carried no MessageId: {e}"))
            })?;
            let message_id = parsed.send_raw_email_result.message_id;
            timer.succeeded();
            info!(reference = %email.reference, %message_id, "AWS SES request finished");
            return Ok(ProviderReference(message_id));
        }

        let err = Self::classify_error(status, &text, &email.to);
        error!(reference = %email.reference, status = %status, error = %err, "AWS SES rejected request");
        Err(err)
    }
}
