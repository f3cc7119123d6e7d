//! Mapping of library errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::ErrorKind;

/// HTTP status reported for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamExchangeFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An error response: a status and a fixed short message.
///
/// The underlying error is logged when the response is built and never
/// included in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "method not allowed",
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        let kind = err.kind();
        match kind {
            ErrorKind::InternalFailure => {
                tracing::error!(module = err.module(), error = %err, "Request failed")
            }
            _ => tracing::debug!(module = err.module(), ?kind, error = %err, "Request rejected"),
        }
        Self {
            status: status_for(kind),
            message: kind.public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
