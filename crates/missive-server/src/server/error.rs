//! Error types for the HTTP surface.
//!
//! [`ApiError`] is what a handler or pipeline stage returns when a request
//! cannot be served. Its [`IntoResponse`] impl writes the status code and a
//! JSON body of the form `{"code": 404, "message": "..."}`.
//!
//! ## Error Cases
//! - `Validation`: a parameter or body failed to parse or validate (400).
//! - `NotFound`: the identifier has no current record (404).
//! - `Internal`: storage failed for a reason the client cannot fix (500).
//! - `Unavailable`: the store reported an integrity fault and the service is
//!   going down (503). The fault itself is latched on the
//!   [`FaultSignal`](crate::server::service::state::FaultSignal), and `main`
//!   exits through [`terminate_on_integrity_fault`].

use crate::server::wire::ErrorBody;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Process exit status used when persisted data cannot be trusted.
pub const INTEGRITY_EXIT_CODE: i32 = 70;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The request was malformed or out of bounds.
    #[error("{reason}")]
    Validation { reason: String },

    /// No message is stored under `id`.
    #[error("message {id} not found")]
    NotFound { id: u64 },

    /// The store failed.
    #[error("{reason}")]
    Internal { reason: String },

    /// Persisted data cannot be trusted; the service is shutting down.
    #[error("message store is unavailable")]
    Unavailable,
}

impl ApiError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, Self::Internal { .. }) {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<missive::Error> for ApiError {
    fn from(err: missive::Error) -> Self {
        match err {
            missive::Error::NotFound { id } => Self::NotFound { id },
            reserved @ missive::Error::ReservedId => Self::validation(reserved.to_string()),
            fatal if fatal.is_fatal() => Self::Unavailable,
            other => Self::Internal {
                reason: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// Logs an integrity fault and exits the process.
///
/// The store has found data it cannot interpret. Serving further requests
/// from it could hand out wrong records or reissue identifiers.
pub fn terminate_on_integrity_fault(reason: &str) -> ! {
    tracing::error!(reason, "integrity fault in message store, terminating");
    std::process::exit(INTEGRITY_EXIT_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn body_carries_code_and_message() {
        let response = ApiError::NotFound { id: 9 }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "code": 404, "message": "message 9 not found" })
        );
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let not_found = ApiError::from(missive::Error::NotFound { id: 3 });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let reserved = ApiError::from(missive::Error::ReservedId);
        assert_eq!(reserved.status(), StatusCode::BAD_REQUEST);

        let cause = serde_json::from_str::<u8>("x").unwrap_err();
        let encode = ApiError::from(missive::Error::Encode(cause));
        assert_eq!(encode.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ApiError::Unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
