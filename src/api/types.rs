//! API request and response types.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error: status plus JSON body.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Body for creating or updating a secret.
///
/// Missing fields deserialize as empty strings so they are reported as
/// validation errors rather than JSON rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSecretRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Cached plaintext for one secret (empty if never written through this service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretValueResponse {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Current server time (RFC3339)
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
