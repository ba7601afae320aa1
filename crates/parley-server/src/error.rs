use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_shared::protocol::ErrorResponse;
use parley_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload rejected by the size or type policy.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Database error: {0}")]
    Store(StoreError),

    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Store(_) | ServerError::BlobStorage(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Record not found".to_string()),
            StoreError::MissingReference(what) => ServerError::NotFound(format!("{what} not found")),
            other => ServerError::Store(other),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ServerError {
    fn from(e: MultipartError) -> Self {
        ServerError::BadRequest(format!("Multipart error: {e}"))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            ErrorResponse {
                error: "Internal server error".to_string(),
                details: Some(self.to_string()),
            }
        } else {
            ErrorResponse {
                error: self.to_string(),
                details: None,
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
