//! evhub-es - Event Submission Service
//!
//! **Module Identity:**
//! - Name: evhub-es (Event Submission)
//! - Port: 5641 (default)
//!
//! Accepts event drafts over HTTP, validates them, uploads their assets
//! to the blob store and writes the composed event record to the store.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evhub_common::events::EventBus;
use evhub_es::storage::FsBlobStore;
use evhub_es::AppState;

/// Command-line arguments for evhub-es
#[derive(Parser, Debug)]
#[command(name = "evhub-es")]
#[command(about = "Event Submission microservice for EvHub")]
#[command(version)]
struct Args {
    /// Root folder for the database and blob containers
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Address to listen on (host:port)
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evhub_es=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting evhub-es (Event Submission) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder (cli → env → config file → platform default)
    let root_folder = evhub_common::config::resolve_root_folder(
        args.root_folder.as_deref(),
        "EVHUB_ROOT",
        Some("root_folder"),
    )?;
    info!("Root folder: {}", root_folder.display());

    // Step 2: Create root folder and blob container directory if missing
    std::fs::create_dir_all(&root_folder)?;
    let blob_root = root_folder.join("blobs");
    std::fs::create_dir_all(&blob_root)?;

    // Step 3: Open or create database
    let db_path = root_folder.join("evhub.db");
    info!("Database: {}", db_path.display());
    let db_pool = evhub_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity
    info!("Event bus initialized");

    // Blob store rooted under <root>/blobs
    let blob_store = Arc::new(FsBlobStore::new(blob_root));

    // Create application state
    let state = AppState::new(db_pool, event_bus, blob_store);

    // Build router
    let app = evhub_es::build_router(state);

    // Start server
    let listen_addr = args.listen.unwrap_or_else(|| {
        evhub_common::config::resolve_listen_addr("EVHUB_LISTEN", Some("listen_addr"))
    });
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Listening on http://{}", listen_addr);
    info!("Health check: http://{}/health", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
