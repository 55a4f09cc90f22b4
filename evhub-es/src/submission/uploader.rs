//! Concurrent asset batch uploader
//!
//! Every file from every asset group is flattened into ONE batch and the
//! whole batch is awaited once. No per-group awaits: a nested await would
//! resolve with group futures still pending and let a half-finished batch
//! look complete. Failures accumulate; one file failing never cancels its
//! siblings.

use chrono::Utc;
use evhub_common::events::{EventBus, SubmissionEvent};
use futures::future;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::models::LocalAsset;
use crate::storage::{AssetReference, BlobStore, StoreError};

/// Asset slot a file was submitted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetGroup {
    Banner,
    Preview,
    SponsorProspectus,
}

impl AssetGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetGroup::Banner => "banner",
            AssetGroup::Preview => "preview",
            AssetGroup::SponsorProspectus => "sponsor_prospectus",
        }
    }

    /// Banner and preview slots accept only images
    pub fn requires_image(&self) -> bool {
        matches!(self, AssetGroup::Banner | AssetGroup::Preview)
    }
}

impl fmt::Display for AssetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file that did not make it into the blob store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFailure {
    pub group: AssetGroup,
    pub file_name: String,
    pub error: StoreError,
}

/// Upload every file of every group as one flat concurrent batch
///
/// Returns the stored references grouped back by asset group, each group
/// in its original input order regardless of upload completion order.
/// If any file fails, returns every failure from the batch; the
/// remaining files still uploaded and their blobs stay in the store.
pub async fn upload_assets(
    store: &dyn BlobStore,
    container: &str,
    prefix: &str,
    event_id: Uuid,
    groups: &[(AssetGroup, &[LocalAsset])],
    bus: &EventBus,
) -> Result<HashMap<AssetGroup, Vec<AssetReference>>, Vec<UploadFailure>> {
    // Flatten (group, index, file) tuples into one batch before anything awaits
    let mut batch = Vec::new();
    for (group, assets) in groups {
        for (index, asset) in assets.iter().enumerate() {
            batch.push(upload_one(
                store, container, prefix, event_id, *group, index, asset, bus,
            ));
        }
    }

    let settled = future::join_all(batch).await;

    let mut indexed: HashMap<AssetGroup, Vec<(usize, AssetReference)>> = HashMap::new();
    for (group, _) in groups {
        indexed.insert(*group, Vec::new());
    }
    let mut failures = Vec::new();
    for (group, index, outcome) in settled {
        match outcome {
            Ok(reference) => indexed.entry(group).or_default().push((index, reference)),
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        return Err(failures);
    }

    // Reassemble by original index, not completion order
    let mut references = HashMap::new();
    for (group, mut entries) in indexed {
        entries.sort_by_key(|(index, _)| *index);
        references.insert(group, entries.into_iter().map(|(_, r)| r).collect());
    }
    Ok(references)
}

#[allow(clippy::too_many_arguments)]
async fn upload_one(
    store: &dyn BlobStore,
    container: &str,
    prefix: &str,
    event_id: Uuid,
    group: AssetGroup,
    index: usize,
    asset: &LocalAsset,
    bus: &EventBus,
) -> (AssetGroup, usize, Result<AssetReference, UploadFailure>) {
    // Slot-level type gate runs before the store is touched
    if group.requires_image() {
        if let Some(content_type) = asset.content_type.as_deref() {
            if !content_type.starts_with("image/") {
                return (
                    group,
                    index,
                    Err(UploadFailure {
                        group,
                        file_name: asset.file_name.clone(),
                        error: StoreError::Rejected {
                            file_name: asset.file_name.clone(),
                            reason: format!("{} slot accepts only images", group),
                        },
                    }),
                );
            }
        }
    }

    match store.upload(asset, container, prefix).await {
        Ok(reference) => {
            bus.emit(SubmissionEvent::AssetUploaded {
                event_id,
                group: group.as_str().to_string(),
                file_name: asset.file_name.clone(),
                timestamp: Utc::now(),
            });
            (group, index, Ok(reference))
        }
        Err(error) => {
            tracing::warn!(
                event_id = %event_id,
                group = %group,
                file_name = %asset.file_name,
                error = %error,
                "Asset upload failed"
            );
            (
                group,
                index,
                Err(UploadFailure {
                    group,
                    file_name: asset.file_name.clone(),
                    error,
                }),
            )
        }
    }
}
