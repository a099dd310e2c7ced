//! Mapping of service errors onto HTTP responses.
//!
//! Every failure body is an [`ErrorResponse`] with a stable `kind`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hibernate_common::ErrorResponse;

use crate::domain::{LifecycleError, RelayError};

#[derive(Debug)]
pub enum ApiError {
    Lifecycle(LifecycleError),
    Relay(RelayError),
    /// A required query parameter is absent.
    MissingParameter(&'static str),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        Self::Lifecycle(err)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self::Relay(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Lifecycle(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Relay(err) => match err {
                RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
                RelayError::InstanceUnreachable => StatusCode::SERVICE_UNAVAILABLE,
                RelayError::RelayFailed { status, .. } => StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                RelayError::ChannelUnavailable(_) => StatusCode::BAD_GATEWAY,
                RelayError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Lifecycle(err) => ErrorResponse::new(err.kind(), err.to_string()),
            Self::Relay(err) => ErrorResponse::new(err.kind(), err.to_string()),
            Self::MissingParameter(name) => {
                ErrorResponse::new("bad_request", format!("missing query parameter `{name}`"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
