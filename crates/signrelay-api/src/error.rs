//! Error types for the signrelay API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use signrelay_docusign::DocuSignError;
use utoipa::ToSchema;

/// API error variants.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Credential exchange failed: {0}")]
    Credential(String),

    #[error("Signing provider rejected the request: {0}")]
    Provider(String),

    #[error("Malformed webhook payload: {0}")]
    WebhookParse(String),

    #[error("Envelope not found")]
    EnvelopeNotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<DocuSignError> for ApiError {
    fn from(err: DocuSignError) -> Self {
        match err {
            DocuSignError::InvalidKey(msg) => ApiError::Credential(msg),
            DocuSignError::Credential { .. } => ApiError::Credential(err.to_string()),
            DocuSignError::Provider { .. } => ApiError::Provider(err.to_string()),
            DocuSignError::Http(e) => ApiError::Provider(format!("request failed: {e}")),
            DocuSignError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// JSON error response returned by API endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Credential(_) => (StatusCode::INTERNAL_SERVER_ERROR, "credential_error"),
            ApiError::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provider_error"),
            ApiError::WebhookParse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "webhook_parse_error"),
            ApiError::EnvelopeNotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
