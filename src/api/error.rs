//! Transport error mapping.
//!
//! The only place where error kinds become HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{CommerceError, ErrorKind};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// Caller identity missing or malformed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self { Self::Commerce(err.into()) }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::VariantRequired
        | ErrorKind::RefundExceedsRemaining
        | ErrorKind::CartEmpty
        | ErrorKind::ShippingZoneNotFound => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ExternalDependency => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Commerce(err) => {
                let kind = err.kind();
                let status = status_for(kind);
                // Don't expose internal error details to clients
                let message = if status.is_server_error() {
                    tracing::error!(error = %err, kind = kind.code(), "Request failed");
                    match kind {
                        ErrorKind::ExternalDependency => "External service error".to_string(),
                        _ => "Internal server error".to_string(),
                    }
                } else {
                    err.to_string()
                };
                (status, kind.code(), message)
            }
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
        };

        (status, Json(ErrorBody { error: message, code })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
