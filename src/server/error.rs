//! Errors returned by the admin server.
//!
//! Every handler returns `Result<T, ServerError>`. Client errors carry their
//! message through; upstream and internal failures are logged in full and
//! answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use fitconnect_core::training::FileError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    /// The replica API failed or answered with an error status.
    #[error("upstream error: {0}")]
    Upstream(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
            ServerError::Upstream(e) => {
                error!(error = ?e, "replica API request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "replica API request failed".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        ServerError::Upstream(e)
    }
}

impl From<FileError> for ServerError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::InvalidPath(p) => ServerError::BadRequest(format!("invalid path: {p}")),
            FileError::NotFound(p) => ServerError::NotFound(format!("file not found: {p}")),
            FileError::Io(e) => ServerError::Internal(e.to_string()),
        }
    }
}
