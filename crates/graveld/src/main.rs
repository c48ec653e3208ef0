//! graveld — the gravel daemon.
//!
//! Single binary that assembles the gravel subsystems:
//! - Ordered key-value store (redb)
//! - Namespace lifecycle manager
//! - Background garbage collector
//! - REST API
//!
//! # Usage
//!
//! ```text
//! graveld serve --listen 0.0.0.0:7070 --data-dir /var/lib/gravel --gc-interval 30s
//! graveld serve --config /etc/gravel/graveld.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gravel_kv::RedbStore;
use gravel_namespace::{IntervalTicker, NamespaceService};
use tokio::sync::watch;
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::config::GraveldConfig;

#[derive(Parser)]
#[command(name = "graveld", about = "gravel namespaced key-value daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API and run garbage collection in the background.
    Serve {
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on.
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Data directory for persistent state.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Pause between garbage collection cycles ("30s", "5m", or seconds).
        #[arg(long)]
        gc_interval: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            listen,
            data_dir,
            gc_interval,
        } => {
            let mut settings = match config {
                Some(path) => GraveldConfig::from_file(&path)?,
                None => GraveldConfig::default(),
            };
            if let Some(listen) = listen {
                settings.listen = listen;
            }
            if let Some(data_dir) = data_dir {
                settings.data_dir = data_dir;
            }
            if let Some(gc_interval) = gc_interval {
                settings.gc_interval = gc_interval;
            }

            init_tracing(&settings.log_filter)?;
            run_serve(settings).await
        }
    }
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn run_serve(config: GraveldConfig) -> anyhow::Result<()> {
    info!("gravel daemon starting");

    let gc_period = config.gc_period()?;

    // Ensure data directory exists.
    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = config.db_path();

    // ── Initialize subsystems ──────────────────────────────────

    let store = RedbStore::open(&db_path)?;
    info!(path = ?db_path, "kv store opened");

    let service = NamespaceService::new(store).with_span(info_span!("namespace"));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let collector = service.clone();
    let gc_handle = tokio::spawn(async move {
        collector
            .garbage_collection(shutdown_rx, IntervalTicker::new(gc_period))
            .await;
    });
    info!(interval_secs = gc_period.as_secs(), "garbage collector started");

    // ── Start API server ───────────────────────────────────────

    let router = gravel_api::build_router(service);
    let addr = config.listen;

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for CTRL+C; running until killed");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for the collector to finish its current cycle.
    if let Err(e) = gc_handle.await {
        error!(error = %e, "garbage collector task failed");
    }

    info!("gravel daemon stopped");
    Ok(())
}
