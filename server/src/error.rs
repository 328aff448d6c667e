use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::clients::UpstreamError;

/// Request handling failures, mapped onto plain text HTTP responses. Upstream
/// failures keep the upstream's status code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    BadRequest(String),
    #[error("not authorized")]
    NotAuthorized,
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

impl From<UpstreamError> for ServiceError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream { status: err.status, message: err.message }
    }
}
