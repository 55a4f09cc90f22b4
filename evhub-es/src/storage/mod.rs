//! Blob storage abstraction
//!
//! All event assets are written through the [`BlobStore`] trait so the
//! pipeline and its tests never care which backend holds the bytes. The
//! shipped backend is [`FsBlobStore`], rooted under the service's data
//! folder.

pub mod fs_store;

pub use fs_store::FsBlobStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::LocalAsset;

/// Container every event asset lives under
pub const EVENT_ASSET_CONTAINER: &str = "events";

/// Durable reference to a stored blob
///
/// This is what the composer writes into the event payload in place of
/// the raw file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetReference {
    /// Container the blob was stored in
    pub container: String,
    /// Key within the container, `<prefix>/<sanitized file name>`
    pub key: String,
    /// Original file name as supplied by the client
    pub file_name: String,
    /// Declared media type, if any
    pub content_type: Option<String>,
    /// Stored size in bytes
    pub size_bytes: u64,
    /// SHA-256 of the stored content, lowercase hex
    pub content_hash: String,
    /// When the blob was stored
    pub uploaded_at: DateTime<Utc>,
}

/// Blob store failure classes
///
/// `Unavailable` is transient (network, disk, lock); `Rejected` means the
/// store refused this particular payload and a retry cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StoreError {
    /// Store temporarily unreachable or out of service
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store refused the payload (type mismatch, quota, unusable name)
    #[error("store rejected {file_name}: {reason}")]
    Rejected { file_name: String, reason: String },
}

/// Destination for uploaded assets
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store one asset under `<container>/<prefix>/`, keeping its
    /// (sanitized) file name. Returns a durable reference on success.
    async fn upload(
        &self,
        asset: &LocalAsset,
        container: &str,
        prefix: &str,
    ) -> Result<AssetReference, StoreError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
