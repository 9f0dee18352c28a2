use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::cluster::ClusterError;
use crate::config::{
    MSG_INVALID_JSON, MSG_METHOD_NOT_ALLOWED, MSG_RESTART_FAILED, MSG_UNAUTHORIZED,
    MSG_UNREADABLE_BODY,
};

/// Request-level failures of the webhook, each mapped to a flat status code
/// and a short plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("failed to read request body: {0}")]
    UnreadableBody(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("restart failed: {0}")]
    Restart(#[from] ClusterError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::UnreadableBody(_) | AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Restart(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client. Causes are logged, never echoed.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::Unauthorized => MSG_UNAUTHORIZED,
            AppError::UnreadableBody(_) => MSG_UNREADABLE_BODY,
            AppError::InvalidJson(_) => MSG_INVALID_JSON,
            AppError::MethodNotAllowed => MSG_METHOD_NOT_ALLOWED,
            AppError::Restart(_) => MSG_RESTART_FAILED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Restart(cause) => {
                tracing::error!(error = %cause, "Failed to restart deployment");
            }
            AppError::Unauthorized => {
                tracing::warn!("Rejected request with missing or invalid token");
            }
            other => {
                tracing::debug!(error = %other, "Rejected request");
            }
        }

        (self.status(), self.public_message()).into_response()
    }
}
