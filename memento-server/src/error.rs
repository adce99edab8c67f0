//! Error types for memento-server
//!
//! Handlers return [`ApiResult`]. Error bodies have the shape
//! `{"error": {"code": "...", "message": "..."}}`; the message is the
//! user-facing text in English, and [`localize_errors`] swaps in the German
//! text when the request prefers it.

use axum::{
    extract::Request,
    http::{header::ACCEPT_LANGUAGE, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use memento_common::{Error, ErrorClass, Locale};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Host identity missing from the request (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request parameter (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Some items of a bulk action failed
    #[error("Bulk action failed for {} of {total} items", .failed.len())]
    BulkFailed { failed: Vec<Uuid>, total: usize },

    /// memento-common error, mapped by its class
    #[error(transparent)]
    Common(#[from] Error),
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Rendered error, kept on the response so the message can be localized
#[derive(Debug, Clone)]
struct ErrorBody {
    code: &'static str,
    messages: [String; 2],
    details: Option<Value>,
}

impl ErrorBody {
    fn json(&self, locale: Locale) -> Json<Value> {
        let message = match locale {
            Locale::En => &self.messages[0],
            Locale::De => &self.messages[1],
        };
        let mut body = json!({
            "error": {
                "code": self.code,
                "message": message,
            }
        });
        if let Some(details) = &self.details {
            body["error"]["details"] = details.clone();
        }
        Json(body)
    }
}

fn status_and_code(err: &Error) -> (StatusCode, &'static str) {
    match (err.class(), err) {
        (ErrorClass::FixInput, Error::Validation(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
        (ErrorClass::FixInput, _) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        (ErrorClass::NotFound, _) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        (ErrorClass::Forbidden, _) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        (ErrorClass::NothingToDo, _) => (StatusCode::CONFLICT, "NOTHING_TO_DO"),
        (ErrorClass::RetryLater, Error::BulkFailed { .. }) => (StatusCode::BAD_GATEWAY, "BULK_FAILED"),
        (ErrorClass::RetryLater, Error::Config(_) | Error::Internal(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
        // Database, I/O and media failures
        (ErrorClass::RetryLater, _) => (StatusCode::SERVICE_UNAVAILABLE, "TRY_AGAIN_LATER"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "UNAUTHORIZED",
                    messages: [
                        "Please sign in as the event host.".to_string(),
                        "Bitte melde dich als Gastgeber an.".to_string(),
                    ],
                    details: None,
                },
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "BAD_REQUEST",
                    messages: [
                        format!("Please check your input: {}", detail),
                        format!("Bitte überprüfe deine Eingabe: {}", detail),
                    ],
                    details: None,
                },
            ),
            ApiError::BulkFailed { failed, total } => {
                let summary = Error::BulkFailed {
                    failed: failed.len(),
                    total: *total,
                };
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        code: "BULK_FAILED",
                        messages: [
                            summary.user_message(Locale::En),
                            summary.user_message(Locale::De),
                        ],
                        details: Some(json!({ "failed": failed })),
                    },
                )
            }
            ApiError::Common(err) => {
                let (status, code) = status_and_code(err);
                (
                    status,
                    ErrorBody {
                        code,
                        messages: [err.user_message(Locale::En), err.user_message(Locale::De)],
                        details: None,
                    },
                )
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let mut response = (status, body.json(Locale::En)).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Middleware re-rendering error bodies in the language the client prefers
pub async fn localize_errors(request: Request, next: Next) -> Response {
    let locale = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(Locale::from_accept_language)
        .unwrap_or_default();

    let response = next.run(request).await;
    if locale == Locale::En {
        return response;
    }

    match response.extensions().get::<ErrorBody>().cloned() {
        Some(body) => (response.status(), body.json(locale)).into_response(),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_common::Rejection;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation(Rejection::TextEmpty), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::Permission("x".into()), StatusCode::FORBIDDEN),
            (Error::Precondition("x".into()), StatusCode::CONFLICT),
            (Error::Transient("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_unauthorized_status() {
        let response = ApiError::Unauthorized("missing header".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
