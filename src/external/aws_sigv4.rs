//! AWS Signature Version 4 for form-encoded query API calls.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
#[error("SigV4 signing failed: {0}")]
pub struct SigningError(String);

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: Credentials,
    region: String,
    service: &'static str,
}

impl SigV4Signer {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
        region: impl Into<String>,
        service: &'static str,
    ) -> Self {
        Self {
            credentials: Credentials::new(access_key, secret_key, session_token, None, "settings"),
            region: region.into(),
            service,
        }
    }

    /// Headers to add to a POST of `body`: `x-amz-date`, `authorization` and,
    /// with a session token, `x-amz-security-token`.
    pub fn sign_post(
        &self,
        url: &Url,
        content_type: &str,
        body: &[u8],
        now: SystemTime,
    ) -> Result<Vec<(String, String)>, SigningError> {
        let identity = self.credentials.clone().into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(self.service)
            .time(now)
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| SigningError(e.to_string()))?
            .into();

        let headers = [("content-type", content_type)];
        let request = SignableRequest::new(
            "POST",
            url.as_str(),
            headers.into_iter(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| SigningError(e.to_string()))?;

        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| SigningError(e.to_string()))?
            .into_parts();
        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // 2026-05-01T12:00:00Z
    fn pinned_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_777_636_800)
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn sign_with(token: Option<String>) -> Vec<(String, String)> {
        let signer = SigV4Signer::new("AKID", "secret", token, "ca-central-1", "ses");
        let url = Url::parse("https://email.ca-central-1.amazonaws.com/").unwrap();
        signer
            .sign_post(&url, "application/x-www-form-urlencoded", b"Action=x", pinned_time())
            .unwrap()
    }

    #[test]
    fn test_authorization_header_shape() {
        let headers = sign_with(None);

        assert_eq!(header(&headers, "x-amz-date"), Some("20260501T120000Z"));
        let authorization = header(&headers, "authorization").unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20260501/ca-central-1/ses/aws4_request, "
        ));
        assert!(authorization.contains("SignedHeaders=content-type;host;x-amz-date"));
        let signature = authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(header(&headers, "x-amz-security-token").is_none());
    }

    #[test]
    fn test_session_token_is_attached() {
        let headers = sign_with(Some("session".into()));
        assert_eq!(header(&headers, "x-amz-security-token"), Some("session"));
    }

    #[test]
    fn test_signature_depends_on_body() {
        let signer = SigV4Signer::new("AKID", "secret", None, "ca-central-1", "ses");
        let url = Url::parse("http://127.0.0.1:8089/").unwrap();
        let sign_body = |body: &[u8]| {
            let headers = signer
                .sign_post(&url, "application/x-www-form-urlencoded", body, pinned_time())
                .unwrap();
            header(&headers, "authorization").unwrap().to_string()
        };
        assert_ne!(sign_body(b"Action=a"), sign_body(b"Action=b"));
        assert_eq!(sign_body(b"Action=a"), sign_body(b"Action=a"));
    }
}
