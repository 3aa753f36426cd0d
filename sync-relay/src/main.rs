//! linesync-relay binary entry point.
//!
//! Usage:
//! ```bash
//! linesync-relay --config relay.toml
//! RUST_LOG=debug linesync-relay
//! ```

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sync_relay::{http, serve, Config, RelayServer};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "relay.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let config = load_config(get_config_path().as_deref())?;
    tracing::info!("linesync-relay v{}", env!("CARGO_PKG_VERSION"));

    let relay = Arc::new(RelayServer::new(config.clone()));

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;

    if config.http.enabled {
        let http_listener = TcpListener::bind(&config.http.bind_address)
            .await
            .with_context(|| format!("failed to bind {}", config.http.bind_address))?;
        tracing::info!(address = %config.http.bind_address, "HTTP endpoints enabled");
        let router = http::build_router(Arc::clone(&relay));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(http_listener, router).await {
                tracing::error!("HTTP server failed: {}", e);
            }
        });
    }

    serve(relay, listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    Ok(())
}

/// Explicit `--config` path, if given.
fn get_config_path() -> Option<PathBuf> {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
}

/// Load the explicit config, else `relay.toml` when present, else defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Ok(Config::from_file(path)?),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Ok(Config::from_file(Path::new(DEFAULT_CONFIG_PATH))?)
        }
        None => Ok(Config::default()),
    }
}
