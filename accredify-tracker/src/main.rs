//! accredify-tracker - Compliance tracking service
//!
//! Serves the project/indicator/evidence API over HTTP (default port 5740).

use std::path::PathBuf;

use accredify_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use accredify_tracker::config::{self, MODULE_NAME};
use accredify_tracker::{build_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for accredify-tracker
#[derive(Parser, Debug)]
#[command(name = "accredify-tracker")]
#[command(about = "Compliance evidence tracking service")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "ACCREDIFY_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ACCREDIFY_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(MODULE_NAME);

    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "info,tower_http=debug".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting accredify-tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml_config(toml_config.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let pool = match accredify_common::db::init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let enrichment = config::resolve_enrichment_settings(&toml_config);
    let enricher = config::build_enricher(&enrichment);

    let state = AppState::new(pool, enricher);
    let app = build_router(state);

    let address = config::resolve_server_address(args.bind_address, args.port, &toml_config);
    let listener = tokio::net::TcpListener::bind(address.socket_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", address.socket_addr()))?;

    info!("Listening on http://{}", address.socket_addr());
    info!("Health check: http://{}/health", address.socket_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
