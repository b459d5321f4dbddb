//! Tracklet REST API Server
//!
//! Serves the issue tracker over HTTP for web clients. Every connected client
//! sees the same live issue list.

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tracklet::commands::CommandExecutor;
use tracklet::config::TrackletConfig;
use tracklet::storage::{InMemoryStorage, IssueStore, JsonFileStorage};
use tracklet_server::{create_routes, AppState};

#[derive(Parser)]
#[command(name = "tracklet-server")]
#[command(about = "REST API server for the tracklet issue tracker", long_about = None)]
struct Args {
    /// Tracklet data directory
    #[arg(long, env = "TRACKLET_DATA_DIR", default_value = ".tracklet")]
    data_dir: PathBuf,

    /// Address to listen on (overrides [server] bind)
    #[arg(long)]
    bind: Option<String>,

    /// Keep issues in memory instead of the data directory
    #[arg(long)]
    memory: bool,

    /// How often to pick up changes made by other processes, in milliseconds
    #[arg(long, default_value_t = 1000)]
    refresh_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    info!("Starting tracklet API server...");

    let config = TrackletConfig::load(&args.data_dir)?;
    let server_config = config.server();
    let addr = args.bind.clone().unwrap_or_else(|| server_config.bind());
    let store_timeout = Duration::from_millis(server_config.store_timeout_ms());

    if args.memory {
        let storage = InMemoryStorage::new();
        let executor = CommandExecutor::with_config(storage, &config);
        executor.init()?;
        info!("Using in-memory issue store");
        return serve(AppState::new(executor, store_timeout), &addr).await;
    }

    let storage = JsonFileStorage::new(&args.data_dir);
    storage.validate().map_err(|e| {
        anyhow::anyhow!(
            "Failed to initialize storage: {}\n\n\
             The server requires an initialized tracklet data directory.\n\
             Run 'tracklet init', or set TRACKLET_DATA_DIR to point to an existing one.",
            e
        )
    })?;
    info!("Using tracklet data directory at: {}", args.data_dir.display());

    spawn_refresh(storage.clone(), Duration::from_millis(args.refresh_ms.max(1)));
    let executor = CommandExecutor::with_config(storage, &config);
    serve(AppState::new(executor, store_timeout), &addr).await
}

/// Re-read the data directory periodically so writes from the CLI reach
/// connected clients.
fn spawn_refresh(storage: JsonFileStorage, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let storage = storage.clone();
            match tokio::task::spawn_blocking(move || storage.refresh()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to refresh issues: {:#}", e),
                Err(e) => warn!("Refresh task failed: {}", e),
            }
        }
    });
}

async fn serve<S: IssueStore + 'static>(state: AppState<S>, addr: &str) -> Result<()> {
    // Build CORS layer for local development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", create_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
