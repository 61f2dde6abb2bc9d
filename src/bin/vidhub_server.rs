//! Federated search server binary.
//!
//! Reads configuration from `$VIDHUB_CONFIG` (or the default config path),
//! serves until Ctrl-C, then cancels in-flight queries, drains open
//! connections and exits.

use std::path::PathBuf;

use vidhub::{AppConfig, SearchServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::var_os("VIDHUB_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_config_path);

    let config = AppConfig::from_file(&path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to load configuration");
        anyhow::anyhow!("failed to load {}: {e}", path.display())
    })?;
    tracing::info!(
        path = %path.display(),
        sources = config.sources.len(),
        users = config.users.len(),
        "configuration loaded"
    );

    let server = SearchServer::start(&config)
        .await
        .map_err(|e| anyhow::anyhow!("vidhub-server failed to start: {e}"))?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown_gracefully().await;

    tracing::info!("vidhub-server shut down cleanly");
    Ok(())
}
