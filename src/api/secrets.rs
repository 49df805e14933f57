//! API endpoints for repository secrets.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tokio::task::JoinError;

use crate::secrets::{MergedSecretView, SyncError};
use crate::store::AuditEntry;

use super::auth::GitHubToken;
use super::routes::AppState;
use super::types::{
    error_response, ApiError, SecretValueResponse, SuccessResponse, UpsertSecretRequest,
};

/// Create the secrets API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/repositories/:owner/:repo/secrets",
            get(list_secrets).post(upsert_secret),
        )
        .route(
            "/api/repositories/:owner/:repo/secrets/:name",
            get(get_secret_value).delete(delete_secret),
        )
        .route(
            "/api/repositories/:owner/:repo/secrets/:name/history",
            get(secret_history),
        )
}

/// Map a synchronizer error to a response. Only validation errors are
/// reported in detail; everything else is a generic failure.
fn sync_error(context: &str, err: SyncError) -> ApiError {
    match err {
        SyncError::Validation(message) => error_response(StatusCode::BAD_REQUEST, message),
        other => {
            tracing::error!("{}: {}", context, other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    }
}

fn mutation_outcome(
    context: &str,
    outcome: Result<Result<(), SyncError>, JoinError>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match outcome {
        Ok(Ok(())) => Ok(Json(SuccessResponse { success: true })),
        Ok(Err(e)) => Err(sync_error(context, e)),
        Err(e) => {
            tracing::error!("{}: task failed: {}", context, e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, context))
        }
    }
}

/// GET /api/repositories/:owner/:repo/secrets
async fn list_secrets(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<GitHubToken>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Vec<MergedSecretView>>, ApiError> {
    let github = state.github(&token.0);
    state
        .secrets
        .list(&github, &owner, &repo)
        .await
        .map(Json)
        .map_err(|e| sync_error("Failed to fetch secrets", e))
}

/// GET /api/repositories/:owner/:repo/secrets/:name
async fn get_secret_value(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, name)): Path<(String, String, String)>,
) -> Result<Json<SecretValueResponse>, ApiError> {
    state
        .secrets
        .read_value(&owner, &repo, &name)
        .await
        .map(|value| Json(SecretValueResponse { value }))
        .map_err(|e| sync_error("Failed to fetch secret value", e))
}

/// POST /api/repositories/:owner/:repo/secrets
///
/// Runs on its own task so a client disconnect cannot stop the local write
/// once the remote write has gone through.
async fn upsert_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<GitHubToken>,
    Path((owner, repo)): Path<(String, String)>,
    payload: Result<Json<UpsertSecretRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
    let sync = Arc::clone(&state.secrets);
    let github = state.github(&token.0);
    let outcome = tokio::spawn(async move {
        sync.upsert(&github, &owner, &repo, &req.name, &req.value)
            .await
    })
    .await;
    mutation_outcome("Failed to create/update secret", outcome)
}

/// DELETE /api/repositories/:owner/:repo/secrets/:name
async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<GitHubToken>,
    Path((owner, repo, name)): Path<(String, String, String)>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let sync = Arc::clone(&state.secrets);
    let github = state.github(&token.0);
    let outcome =
        tokio::spawn(async move { sync.delete(&github, &owner, &repo, &name).await }).await;
    mutation_outcome("Failed to delete secret", outcome)
}

/// GET /api/repositories/:owner/:repo/secrets/:name/history
async fn secret_history(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, name)): Path<(String, String, String)>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    state
        .secrets
        .history(&owner, &repo, Some(&name))
        .await
        .map(Json)
        .map_err(|e| sync_error("Failed to fetch secret history", e))
}
