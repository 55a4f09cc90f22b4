//! Filesystem-backed blob store

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use super::{AssetReference, BlobStore, StoreError};
use crate::models::LocalAsset;

/// Default per-blob size limit (25 MiB)
const DEFAULT_MAX_BLOB_BYTES: u64 = 25 * 1024 * 1024;

/// Hex digits of the content hash carried in each stored file name
const KEY_HASH_PREFIX_LEN: usize = 12;

/// Blob store that writes under a local root directory
///
/// Layout: `<root>/<container>/<prefix>/<hash>-<file name>`, where
/// `hash` is the leading hex of the blob's SHA-256. Same-named files
/// with different content occupy different keys; re-uploading identical
/// content lands on its existing key. Writes go to a uniquely named
/// temporary sibling first and are renamed into place, so a crash never
/// leaves a partially written blob at a final key.
pub struct FsBlobStore {
    root: PathBuf,
    max_blob_bytes: u64,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
        }
    }

    pub fn with_max_blob_bytes(root: impl Into<PathBuf>, max_blob_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_blob_bytes,
        }
    }

    fn check_acceptable(&self, asset: &LocalAsset) -> Result<(), StoreError> {
        if asset.bytes.is_empty() {
            return Err(StoreError::Rejected {
                file_name: asset.file_name.clone(),
                reason: "file is empty".to_string(),
            });
        }

        if asset.size_bytes() > self.max_blob_bytes {
            return Err(StoreError::Rejected {
                file_name: asset.file_name.clone(),
                reason: format!(
                    "file exceeds the {} byte size limit",
                    self.max_blob_bytes
                ),
            });
        }

        // A declared image must actually contain image bytes
        if let Some(content_type) = asset.content_type.as_deref() {
            if content_type.starts_with("image/") {
                let sniffed_image = infer::get(&asset.bytes)
                    .map(|kind| kind.matcher_type() == infer::MatcherType::Image)
                    .unwrap_or(false);
                if !sniffed_image {
                    return Err(StoreError::Rejected {
                        file_name: asset.file_name.clone(),
                        reason: format!("content does not match declared type {}", content_type),
                    });
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(
        &self,
        asset: &LocalAsset,
        container: &str,
        prefix: &str,
    ) -> Result<AssetReference, StoreError> {
        self.check_acceptable(asset)?;

        let file_name = sanitize_file_name(&asset.file_name);
        if file_name.is_empty() {
            return Err(StoreError::Rejected {
                file_name: asset.file_name.clone(),
                reason: "unusable file name".to_string(),
            });
        }

        let dir = self.root.join(container).join(prefix);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // Content hash in the name keeps same-named uploads on distinct keys
        let content_hash = format!("{:x}", Sha256::digest(&asset.bytes));
        let stored_name = format!("{}-{}", &content_hash[..KEY_HASH_PREFIX_LEN], file_name);
        let final_path = dir.join(&stored_name);
        let temp_path = dir.join(format!(".{}.{}.part", stored_name, Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&temp_path, &asset.bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::Unavailable(e.to_string()));
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::Unavailable(e.to_string()));
        }

        let key = format!("{}/{}", prefix, stored_name);

        debug!(
            key = %key,
            size_bytes = asset.size_bytes(),
            "Stored blob"
        );

        Ok(AssetReference {
            container: container.to_string(),
            key,
            file_name: asset.file_name.clone(),
            content_type: asset.content_type.clone(),
            size_bytes: asset.size_bytes(),
            content_hash,
            uploaded_at: Utc::now(),
        })
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}

/// Reduce a client-supplied file name to a safe single path segment
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const PDF_MAGIC: &[u8] = b"%PDF-1.7 prospectus body";

    fn png(name: &str) -> LocalAsset {
        LocalAsset::new(name, Some("image/png".to_string()), Bytes::from_static(PNG_MAGIC))
    }

    fn stored_name(bytes: &[u8], name: &str) -> String {
        let hash = format!("{:x}", Sha256::digest(bytes));
        format!("{}-{}", &hash[..KEY_HASH_PREFIX_LEN], name)
    }

    #[tokio::test]
    async fn test_upload_writes_blob_and_returns_reference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let asset = png("banner.png");

        let reference = store
            .upload(&asset, "events", "2026/abc-123")
            .await
            .expect("upload succeeds");

        let expected_name = stored_name(PNG_MAGIC, "banner.png");
        assert_eq!(reference.container, "events");
        assert_eq!(reference.key, format!("2026/abc-123/{}", expected_name));
        assert_eq!(reference.file_name, "banner.png");
        assert_eq!(reference.size_bytes, PNG_MAGIC.len() as u64);
        assert_eq!(
            reference.content_hash,
            format!("{:x}", Sha256::digest(PNG_MAGIC))
        );

        let stored = dir.path().join("events/2026/abc-123").join(expected_name);
        assert!(stored.exists());
        assert_eq!(std::fs::read(stored).expect("readable"), PNG_MAGIC);
    }

    #[tokio::test]
    async fn test_mislabeled_image_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let asset = LocalAsset::new(
            "banner.png",
            Some("image/png".to_string()),
            Bytes::from_static(b"<html>not an image</html>"),
        );

        let err = store
            .upload(&asset, "events", "2026/abc")
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_non_image_type_skips_sniffing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let asset = LocalAsset::new(
            "prospectus.pdf",
            Some("application/pdf".to_string()),
            Bytes::from_static(PDF_MAGIC),
        );

        let reference = store
            .upload(&asset, "events", "2026/abc")
            .await
            .expect("pdf accepted");
        assert_eq!(
            reference.key,
            format!("2026/abc/{}", stored_name(PDF_MAGIC, "prospectus.pdf"))
        );
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::with_max_blob_bytes(dir.path(), 4);
        let asset = png("banner.png");

        let err = store
            .upload(&asset, "events", "2026/abc")
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let asset = LocalAsset::new("empty.png", Some("image/png".to_string()), Bytes::new());

        let err = store
            .upload(&asset, "events", "2026/abc")
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_file_name_sanitized_against_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let asset = LocalAsset::new(
            "../../etc/silly name!.png",
            Some("image/png".to_string()),
            Bytes::from_static(PNG_MAGIC),
        );

        let reference = store
            .upload(&asset, "events", "2026/abc")
            .await
            .expect("upload succeeds");
        let expected_name = stored_name(PNG_MAGIC, "silly_name_.png");
        assert_eq!(reference.key, format!("2026/abc/{}", expected_name));
        assert!(dir.path().join("events/2026/abc").join(expected_name).exists());
        // Original name survives on the reference for display purposes
        assert_eq!(reference.file_name, "../../etc/silly name!.png");
    }

    #[tokio::test]
    async fn test_same_named_uploads_keep_distinct_blobs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let gold = LocalAsset::new(
            "prospectus.pdf",
            Some("application/pdf".to_string()),
            Bytes::from_static(b"%PDF-1.7 gold tier"),
        );
        let silver = LocalAsset::new(
            "prospectus.pdf",
            Some("application/pdf".to_string()),
            Bytes::from_static(b"%PDF-1.7 silver tier"),
        );

        let ref_gold = store
            .upload(&gold, "events", "2026/abc")
            .await
            .expect("gold stored");
        let ref_silver = store
            .upload(&silver, "events", "2026/abc")
            .await
            .expect("silver stored");

        // Same client name, different bytes: two keys, both blobs intact
        assert_ne!(ref_gold.key, ref_silver.key);
        let gold_bytes =
            std::fs::read(dir.path().join("events").join(&ref_gold.key)).expect("gold blob");
        let silver_bytes =
            std::fs::read(dir.path().join("events").join(&ref_silver.key)).expect("silver blob");
        assert_eq!(gold_bytes, b"%PDF-1.7 gold tier");
        assert_eq!(silver_bytes, b"%PDF-1.7 silver tier");
        assert_eq!(
            ref_gold.content_hash,
            format!("{:x}", Sha256::digest(b"%PDF-1.7 gold tier"))
        );
        assert_eq!(
            ref_silver.content_hash,
            format!("{:x}", Sha256::digest(b"%PDF-1.7 silver tier"))
        );
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        let asset = png("banner.png");

        // A directory squatting on the final path makes the rename fail
        let final_path = dir
            .path()
            .join("events/2026/abc")
            .join(stored_name(PNG_MAGIC, "banner.png"));
        std::fs::create_dir_all(&final_path).expect("squatter dir");

        let err = store
            .upload(&asset, "events", "2026/abc")
            .await
            .expect_err("rename must fail");
        assert!(matches!(err, StoreError::Unavailable(_)));

        let leftovers: Vec<String> = std::fs::read_dir(dir.path().join("events/2026/abc"))
            .expect("dir listing")
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("banner.png"), "banner.png");
        assert_eq!(sanitize_file_name("a-b_c.2026.pdf"), "a-b_c.2026.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("dir/inner.png"), "inner.png");
    }
}
