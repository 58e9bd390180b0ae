//! API error type and HTTP response mapping

use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use blaze_sandbox::SandboxError;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by every handler, rendered as a plain text body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map a pipeline failure to a response.
    ///
    /// Client mistakes become 400 with the reason; everything else is a 500
    /// with `summary`, followed by compiler diagnostics when there are any.
    pub fn from_sandbox(err: SandboxError, summary: &str) -> Self {
        if err.is_input_error() {
            warn!("Rejected request: {}", err);
            return Self::bad_request(err.to_string());
        }

        error!("{}: {}", summary, err);
        match err.diagnostics() {
            Some(diagnostics) => Self::internal(format!("{summary}\n\n{diagnostics}")),
            None => Self::internal(summary),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Malformed request body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, rejection.body_text());
        }
        // Missing fields and wrong types are client errors too, not 422s.
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}
