//! Repository listing passthrough.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::auth::GitHubToken;
use super::routes::AppState;
use super::types::{error_response, ApiError};

/// GET /api/repositories
/// Repositories visible to the caller's token, as GitHub returns them.
pub async fn list_repositories(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<GitHubToken>,
) -> Result<Json<Value>, ApiError> {
    state
        .github(&token.0)
        .list_repositories()
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to fetch repositories: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch repositories",
            )
        })
}
