//! Maps `AppError` onto HTTP responses and normalizes every error body to
//! `{code, message, details, request_id}`.

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::RequestId;
use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Largest non-JSON error body read back when normalizing.
const MAX_PLAIN_ERROR_BODY: usize = 64 * 1024;

pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } | AppError::AllocationConflict { .. } => StatusCode::CONFLICT,
        AppError::Validation { .. }
        | AppError::ValidationErrors { .. }
        | AppError::BadRequest { .. }
        | AppError::InvalidRecipient { .. } => StatusCode::BAD_REQUEST,
        AppError::UnprocessableContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::NoProviderAvailable { .. }
        | AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Provider { .. } => StatusCode::BAD_GATEWAY,
        AppError::ProviderNotConfigured { .. }
        | AppError::Database { .. }
        | AppError::Configuration { .. }
        | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Duplicate { .. } => "DUPLICATE_ENTRY",
        AppError::Validation { .. } | AppError::ValidationErrors { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::UnprocessableContent { .. } => "UNPROCESSABLE_CONTENT",
        AppError::NoProviderAvailable { .. } => "NO_PROVIDER_AVAILABLE",
        AppError::ProviderNotConfigured { .. } => "PROVIDER_NOT_CONFIGURED",
        AppError::InvalidRecipient { .. } => "INVALID_RECIPIENT",
        AppError::AllocationConflict { .. } => "ALLOCATION_CONFLICT",
        AppError::Provider { .. } => "PROVIDER_ERROR",
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

/// Body for `error`. Server-side failures never expose their source.
pub fn error_body(error: &AppError) -> ErrorResponse {
    let code = error_to_code(error);
    match error {
        AppError::NotFound { entity, field, value } => {
            ErrorResponse::not_found_error(entity, field, value)
        }
        AppError::Duplicate { entity, field, value } => {
            ErrorResponse::duplicate_error(entity, field, value)
        }
        AppError::Validation { field, reason } => ErrorResponse::validation_error(field, reason),
        AppError::ValidationErrors { errors } => ErrorResponse::validation_errors(errors),
        AppError::BadRequest { message } | AppError::UnprocessableContent { message } => {
            ErrorResponse::new(code, message)
        }
        AppError::InvalidRecipient { reason } => ErrorResponse::new(code, reason),
        AppError::AllocationConflict { short_number_id } => {
            ErrorResponse::new(code, "Short number is not available")
                .with_details(json!({ "short_number_id": short_number_id }))
        }
        AppError::NoProviderAvailable { channel } => {
            ErrorResponse::new(code, &format!("No active {} provider", channel))
        }
        AppError::Provider { provider, .. } => {
            ErrorResponse::new(code, &format!("Provider {} request failed", provider))
        }
        AppError::Database { operation, .. } => ErrorResponse::new(
            code,
            &format!("Database operation failed: {}", operation),
        ),
        AppError::Configuration { key, .. } => {
            ErrorResponse::new(code, &format!("Configuration error: {}", key))
        }
        AppError::ProviderNotConfigured { .. } | AppError::Internal { .. } => {
            ErrorResponse::new(code, "An internal error occurred")
        }
        AppError::ConnectionPool { .. } => {
            ErrorResponse::new(code, "Database connection unavailable")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = error_body(&self);
        let mut response = (status, Json(body.clone())).into_response();
        // Picked up by `global_error_handler` to attach the request id.
        response.extensions_mut().insert(body);
        response
    }
}

/// Stamps the request id on `AppError` bodies and rewrites the framework's
/// plain-text errors (unknown route, wrong method, bad JSON) into the same
/// shape.
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|r| r.0.clone());
    let response = next.run(request).await;
    let status = response.status();

    if let Some(body) = response.extensions().get::<ErrorResponse>().cloned() {
        let body = match &request_id {
            Some(id) => body.with_request_id(id),
            None => body,
        };
        return rebuild(response, status, body);
    }

    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = axum::body::to_bytes(body, MAX_PLAIN_ERROR_BODY)
        .await
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        text
    };

    let mut body = ErrorResponse::new(default_code(status), &message);
    if let Some(id) = &request_id {
        body = body.with_request_id(id);
    }
    rebuild(Response::from_parts(parts, Body::empty()), status, body)
}

fn rebuild(original: Response, status: StatusCode, body: ErrorResponse) -> Response {
    let (mut parts, _) = original.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let fresh = (status, Json(body)).into_response();
    let (fresh_parts, fresh_body) = fresh.into_parts();
    parts.headers.extend(fresh_parts.headers);
    Response::from_parts(parts, fresh_body)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

fn default_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_CONTENT",
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => "TIMEOUT",
        StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
        s if s.is_server_error() => "INTERNAL_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFieldError;

    #[test]
    fn test_status_and_code_mapping() {
        let cases = [
            (AppError::not_found("Notification", "id", "1"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::AllocationConflict {
                    short_number_id: "x".into(),
                },
                StatusCode::CONFLICT,
                "ALLOCATION_CONFLICT",
            ),
            (
                AppError::ValidationErrors { errors: vec![] },
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AppError::NoProviderAvailable {
                    channel: "sms".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "NO_PROVIDER_AVAILABLE",
            ),
            (
                AppError::ConnectionPool {
                    source: anyhow::anyhow!("Pool exhausted"),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
            ),
            (
                AppError::Internal {
                    source: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (error, status, code) in cases {
            assert_eq!(error_to_status_code(&error), status, "{error:?}");
            assert_eq!(error_to_code(&error), code);
        }
    }

    #[test]
    fn test_server_errors_do_not_leak_source() {
        let error = AppError::Database {
            operation: "select notifications".into(),
            source: anyhow::anyhow!("password authentication failed for user notify"),
        };
        let body = serde_json::to_string(&error_body(&error)).unwrap();
        assert!(!body.contains("password"));
    }

    #[test]
    fn test_validation_errors_body_lists_fields() {
        let error = AppError::ValidationErrors {
            errors: vec![
                ValidationFieldError::new("body", "body missing from Sinch callback data"),
                ValidationFieldError::new("to", "to missing from Sinch callback data"),
            ],
        };
        let body = error_body(&error);
        let fields: Vec<_> = body.details.as_ref().unwrap()["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, ["body", "to"]);
    }

    #[tokio::test]
    async fn test_into_response_carries_body_extension() {
        let response = AppError::BadRequest {
            message: "nope".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.extensions().get::<ErrorResponse>().map(|b| b.code.as_str()),
            Some("BAD_REQUEST")
        );
    }
}
