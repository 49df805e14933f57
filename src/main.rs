//! secret-sync - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the secrets API.

use secret_sync::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secret_sync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: github_api_url={}, data_dir={}, purge_stale_secrets={}",
        config.github_api_url,
        config.data_dir.display(),
        config.purge_stale_secrets
    );

    api::serve(config).await?;

    Ok(())
}
