//! HTTP route handlers.

use std::sync::Arc;

use axum::middleware;
use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::remote::GitHubClient;
use crate::secrets::Synchronizer;
use crate::store::{AuditLog, InMemorySecretStore, SecretStore, SqliteSecretStore};

use super::auth;
use super::repositories;
use super::secrets as secrets_api;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Secret synchronizer over the local cache and audit log
    pub secrets: Arc<Synchronizer>,
    /// Pooled HTTP client for GitHub requests
    pub http: reqwest::Client,
}

impl AppState {
    /// GitHub client acting with the caller's token.
    pub fn github(&self, token: &str) -> GitHubClient {
        GitHubClient::new(self.http.clone(), &self.config.github_api_url, token)
    }
}

/// Build the router for the given state.
pub fn app(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/validate", post(auth::validate));

    let protected_routes = Router::new()
        .route("/api/repositories", get(repositories::list_repositories))
        .merge(secrets_api::routes())
        .route_layer(middleware::from_fn(auth::require_token));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the configured secret store.
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn SecretStore>, Arc<dyn AuditLog>)> {
    if config.in_memory_store {
        tracing::warn!("Using in-memory secret store; cached values will not survive a restart");
        let store = Arc::new(InMemorySecretStore::new());
        return Ok((store.clone(), store));
    }

    let store = Arc::new(
        SqliteSecretStore::new(config.data_dir.clone())
            .await
            .map_err(anyhow::Error::msg)?,
    );
    Ok((store.clone(), store))
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let (store, audit) = open_store(&config).await?;
    let secrets = Arc::new(
        Synchronizer::new(store, audit).with_stale_purge(config.purge_stale_secrets),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        secrets,
        http: reqwest::Client::new(),
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: crate::store::now_string(),
    })
}
