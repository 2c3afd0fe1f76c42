use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::services::appwrite::StoreError;
use crate::services::crypto::CipherError;

/// Everything a request can fail with. Controllers return
/// `Result<_, ApiError>` and the conversion to the wire shape
/// (`{"error": ..., "details": ...}`) happens in one place.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    /// No live session for the account; the caller must connect first.
    #[error("account {0} is not connected")]
    NotConnected(String),

    /// The deploy/connect/synchronize sequence failed partway through.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The trading backend answered, but with a failure.
    #[error("{0}")]
    Upstream(String),

    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    #[error("credential cipher error: {0}")]
    Cipher(#[from] CipherError),
}

impl ApiError {
    /// Maps a store miss to a domain 404 for the named entity; every other
    /// store failure stays a store failure.
    pub fn entity(name: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |e| match e {
            StoreError::NotFound => ApiError::NotFound(name),
            e => ApiError::Store(e),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) | ApiError::Store(StoreError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotConnected(_)
            | ApiError::Connection(_)
            | ApiError::Upstream(_)
            | ApiError::Store(_)
            | ApiError::Cipher(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::Store(e) => Some(e.to_string()),
            ApiError::Cipher(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({
            "error": self.to_string(),
            "details": self.details(),
        });
        (status, Json(body)).into_response()
    }
}
