//! evhub-es library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod storage;
pub mod submission;
pub mod validate;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use evhub_common::events::EventBus;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::storage::BlobStore;
use crate::submission::CancellationTokens;

/// Upper bound for one multipart submission body; individual files are
/// limited separately by the blob store
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Blob store receiving submitted assets
    pub blob_store: Arc<dyn BlobStore>,
    /// Cancellation tokens for submission attempts in flight
    pub cancellation_tokens: CancellationTokens,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            db,
            event_bus,
            blob_store,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::event_routes())
        .route("/events/stream", get(api::event_stream))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
