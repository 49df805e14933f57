//! Bearer-token forwarding.
//!
//! This service keeps no accounts. Callers present a GitHub token as
//! `Authorization: Bearer <token>`; protected routes refuse requests without
//! one and hand the token to the GitHub client for that request only.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::routes::AppState;
use super::types::{error_response, ValidateTokenRequest, ValidateTokenResponse};
use crate::util::bearer_token;

/// The caller's GitHub token, inserted into request extensions by [`require_token`].
#[derive(Clone)]
pub struct GitHubToken(pub String);

impl std::fmt::Debug for GitHubToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GitHubToken(<redacted>)")
    }
}

pub async fn require_token(mut req: Request<Body>, next: Next) -> Response {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    match token {
        Some(token) => {
            req.extensions_mut().insert(GitHubToken(token));
            next.run(req).await
        }
        None => error_response(StatusCode::UNAUTHORIZED, "Missing Authorization header")
            .into_response(),
    }
}

/// POST /api/auth/validate
/// Check a token against GitHub's authenticated-user endpoint.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateTokenRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()).into_response(),
    };

    let token = req.token.as_deref().map(str::trim).unwrap_or("");
    if token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ValidateTokenResponse {
                valid: false,
                message: Some("Token is required".to_string()),
            }),
        )
            .into_response();
    }

    match state.github(token).authenticated_user().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ValidateTokenResponse {
                valid: true,
                message: None,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!("Token validation failed: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(ValidateTokenResponse {
                    valid: false,
                    message: Some("Invalid token".to_string()),
                }),
            )
                .into_response()
        }
    }
}
