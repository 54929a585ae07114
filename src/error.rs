//! HTTP-facing error type.
//!
//! Handlers return `Result<_, AppError>`; module errors convert through
//! `From` and pick their status here, the same way every route maps its
//! service error to a `StatusCode`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::hub::HubError;
use crate::mask::{DataUrlError, MaskError};
use crate::message::MessageError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Timeout(#[from] HubError),
    #[error("upstream failed: {0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MessageError> for AppError {
    fn from(e: MessageError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<DataUrlError> for AppError {
    fn from(e: DataUrlError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<MaskError> for AppError {
    fn from(e: MaskError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidFilename(_) => Self::BadRequest(e.to_string()),
            StoreError::Io(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}
