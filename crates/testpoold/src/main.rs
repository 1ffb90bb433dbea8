//! testpoold — the test-data pool daemon.
//!
//! Single binary that assembles the service:
//! - Record store (redb)
//! - Settings store (flat JSON file)
//! - REST API (axum)
//!
//! # Usage
//!
//! ```text
//! testpoold serve --port 8700 --data-dir /var/lib/testpool
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "testpoold", about = "Test-data pool daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pool service (record store + REST API in one process).
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8700")]
        port: u16,

        /// Data directory for the record database and settings file.
        #[arg(long, default_value = "/var/lib/testpool")]
        data_dir: PathBuf,

        /// Settings file path (defaults to `<data-dir>/settings.json`).
        #[arg(long)]
        settings_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,testpoold=debug,testpool=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            settings_file,
        } => run_serve(port, data_dir, settings_file).await,
    }
}

async fn run_serve(
    port: u16,
    data_dir: PathBuf,
    settings_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("test-data pool daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("testpool.redb");
    let settings_path = settings_file.unwrap_or_else(|| data_dir.join("settings.json"));

    // Record store.
    let store = testpool_state::RecordStore::open(&db_path)?;
    info!(path = ?db_path, "record store opened");

    // Settings store (missing/corrupt file degrades to defaults).
    let settings = Arc::new(testpool_state::SettingsStore::load(&settings_path));
    info!(path = ?settings_path, "settings loaded");

    // ── Start API server ───────────────────────────────────────

    let router = testpool_api::build_router(store, settings);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    });

    server.await?;

    info!("test-data pool daemon stopped");
    Ok(())
}
