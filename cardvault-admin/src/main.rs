//! cardvault-admin - card inventory administration service
//!
//! Resolves its root folder, opens the SQLite database, and serves the admin
//! HTTP API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use cardvault_admin::services::{BlobStore, ScryfallClient};
use cardvault_admin::{build_router, AppState};
use cardvault_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use cardvault_common::db::init_database;
use cardvault_common::time::secs_to_duration;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "cardvault-admin")]
#[command(about = "Card inventory administration service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and stored images
    #[arg(short, long, env = "CARDVAULT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// HTTP port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the Scryfall API
    #[arg(long)]
    scryfall_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level can come from the config file, so it is read first
    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting CardVault Admin (cardvault-admin) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &toml_config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let store = BlobStore::new(initializer.storage_path());
    info!("Storage path: {}", store.root().display());

    let base_url = cardvault_admin::config::resolve_scryfall_base_url(
        args.scryfall_url.as_deref(),
        &toml_config,
    );
    let client = ScryfallClient::new(&base_url, secs_to_duration(toml_config.http_timeout_secs()))
        .context("Failed to build Scryfall client")?;

    let state = AppState::new(pool, store, Arc::new(client));
    let app = build_router(state);

    let port = args.port.unwrap_or_else(|| toml_config.port());
    let addr: SocketAddr = format!("{}:{}", toml_config.bind_address(), port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("cardvault-admin listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
