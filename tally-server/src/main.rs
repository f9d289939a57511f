//! tally-server - community voting and election ballot service
//!
//! Configuration resolves CLI argument → environment variable → TOML file →
//! built-in default.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tally_common::config::{load_config, write_toml_config};
use tally_common::db::init_database;
use tally_server::{build_router, start_background_tasks, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tally-server
#[derive(Parser, Debug)]
#[command(name = "tally-server")]
#[command(about = "Community vote ledger and election ballot service")]
#[command(version)]
struct Args {
    /// Path to config.toml
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides [storage] database_path)
    #[arg(short, long, env = "TALLY_DATABASE")]
    database: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "TALLY_PORT")]
    port: Option<u16>,

    /// Write the effective configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.storage.database_path = Some(database);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(path) = args.write_config {
        write_toml_config(&config, &path)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    // RUST_LOG wins over [logging] level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tally_server={0},tally_common={0},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tally-server v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.storage.resolved_database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path, &config.storage).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool, &config).context("Failed to build application state")?;
    let tasks = start_background_tasks(&state, &config);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("tally-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tasks.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            Ok(mut stream) => {
                stream.recv().await;
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
