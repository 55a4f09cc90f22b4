//! Submission composer
//!
//! Builds the flat event payload from the validated draft and the stored
//! asset references, then writes it to the record store as one idempotent
//! upsert. Re-running the composer with the same context overwrites the
//! same row instead of duplicating it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::context::SubmissionContext;
use super::uploader::AssetGroup;
use super::SubmissionError;
use crate::db::events_repo;
use crate::models::{EventStatus, ValidatedDraft};
use crate::storage::AssetReference;

/// Bounded retry for a transiently unavailable record store
const MAX_PERSIST_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Composed event record ready for the store
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub owner_id: Uuid,
    pub status: EventStatus,
    pub payload: Value,
}

/// Compose the flat payload for one validated, fully uploaded draft
///
/// Submission always writes status `Draft`; publishing is a separate
/// workflow. The banner and preview references are re-checked here even
/// though the uploader already required them, so a half-assembled batch
/// can never slip into the store.
pub fn compose(
    owner_id: Uuid,
    context: &SubmissionContext,
    draft: &ValidatedDraft,
    references: &HashMap<AssetGroup, Vec<AssetReference>>,
) -> Result<EventRecord, SubmissionError> {
    let banner = references
        .get(&AssetGroup::Banner)
        .and_then(|refs| refs.first())
        .ok_or_else(|| {
            SubmissionError::PayloadRejected("banner reference missing after upload".to_string())
        })?;
    let preview = references
        .get(&AssetGroup::Preview)
        .and_then(|refs| refs.first())
        .ok_or_else(|| {
            SubmissionError::PayloadRejected("preview reference missing after upload".to_string())
        })?;
    let sponsor_prospectus = references
        .get(&AssetGroup::SponsorProspectus)
        .cloned()
        .unwrap_or_default();

    let mut payload = Map::new();
    payload.insert("title".to_string(), json!(draft.title));
    insert_opt_text(&mut payload, "tagline", &draft.tagline);
    insert_opt_text(&mut payload, "timezone", &draft.timezone);
    payload.insert("start_date".to_string(), json!(draft.start_date));
    payload.insert("end_date".to_string(), json!(draft.end_date));
    insert_opt_text(&mut payload, "twitter", &draft.twitter);
    insert_opt_text(&mut payload, "hashtag", &draft.hashtag);
    insert_opt_text(&mut payload, "website", &draft.website);
    payload.insert("contact_email".to_string(), json!(draft.contact_email));
    payload.insert("event_type".to_string(), json!(draft.event_type.as_str()));
    insert_opt_text(&mut payload, "location", &draft.location);
    payload.insert("address1".to_string(), json!(draft.address1));
    insert_opt_text(&mut payload, "address2", &draft.address2);
    payload.insert("city".to_string(), json!(draft.city));
    payload.insert("state_province".to_string(), json!(draft.state_province));
    payload.insert("postal_code".to_string(), json!(draft.postal_code));
    payload.insert("country".to_string(), json!(draft.country));
    payload.insert(
        "registration_url".to_string(),
        json!(draft.registration_url),
    );
    payload.insert(
        "registration_start_date".to_string(),
        json!(draft.registration_start_date),
    );
    payload.insert(
        "registration_end_date".to_string(),
        json!(draft.registration_end_date),
    );
    insert_opt_text(&mut payload, "sessionize_key", &draft.sessionize_key);
    insert_opt_date(
        &mut payload,
        "speaker_call_start_date",
        &draft.speaker_call_start_date,
    );
    insert_opt_date(
        &mut payload,
        "speaker_call_end_date",
        &draft.speaker_call_end_date,
    );
    insert_opt_date(
        &mut payload,
        "sponsor_call_start_date",
        &draft.sponsor_call_start_date,
    );
    insert_opt_date(
        &mut payload,
        "sponsor_call_end_date",
        &draft.sponsor_call_end_date,
    );

    payload.insert("banner_rights".to_string(), json!(draft.banner_rights));
    if let Some(attribution) = &draft.banner_attribution {
        payload.insert(
            "banner_img_attribution_text".to_string(),
            json!(attribution.text),
        );
        payload.insert(
            "banner_img_attribution_link".to_string(),
            json!(attribution.link),
        );
    }
    payload.insert("preview_rights".to_string(), json!(draft.preview_rights));
    if let Some(attribution) = &draft.preview_attribution {
        payload.insert(
            "preview_img_attribution_text".to_string(),
            json!(attribution.text),
        );
        payload.insert(
            "preview_img_attribution_link".to_string(),
            json!(attribution.link),
        );
    }

    payload.insert("banner_img".to_string(), json!(banner));
    payload.insert("preview_img".to_string(), json!(preview));
    if !sponsor_prospectus.is_empty() {
        payload.insert(
            "sponsor_prospectus".to_string(),
            json!(sponsor_prospectus),
        );
    }

    Ok(EventRecord {
        event_id: context.event_id,
        owner_id,
        status: EventStatus::Draft,
        payload: Value::Object(payload),
    })
}

/// Persist the record, retrying a transiently unavailable store
///
/// Retries reuse the exact same record (same event id, same payload), so
/// a success after retries still lands on the one row the context names.
/// Non-transient store errors fail immediately.
pub async fn persist_with_retry(
    pool: &SqlitePool,
    record: &EventRecord,
) -> Result<(), SubmissionError> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match events_repo::upsert_event(pool, record).await {
            Ok(()) => return Ok(()),
            Err(evhub_common::Error::Database(error)) if is_transient(&error) => {
                if attempt >= MAX_PERSIST_ATTEMPTS {
                    tracing::error!(
                        event_id = %record.event_id,
                        attempt,
                        error = %error,
                        "Record store still unavailable, giving up"
                    );
                    return Err(SubmissionError::StoreUnavailable(error.to_string()));
                }
                tracing::warn!(
                    event_id = %record.event_id,
                    attempt,
                    error = %error,
                    "Record store unavailable, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(error) => {
                tracing::error!(
                    event_id = %record.event_id,
                    error = %error,
                    "Record store rejected payload"
                );
                return Err(SubmissionError::PayloadRejected(error.to_string()));
            }
        }
    }
}

/// Transient store faults worth retrying; everything else means the
/// payload itself was refused
fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => {
            let message = db.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}

fn insert_opt_text(payload: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        payload.insert(key.to_string(), json!(value));
    }
}

fn insert_opt_date(payload: &mut Map<String, Value>, key: &str, value: &Option<DateTime<Utc>>) {
    if let Some(value) = value {
        payload.insert(key.to_string(), json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attribution, EventType, LocalAsset};
    use bytes::Bytes;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn image(name: &str) -> LocalAsset {
        LocalAsset::new(name, Some("image/png".to_string()), Bytes::from_static(b"png"))
    }

    fn validated_draft() -> ValidatedDraft {
        ValidatedDraft {
            title: "RustConf Rheinland".to_string(),
            tagline: None,
            timezone: Some("Europe/Berlin".to_string()),
            start_date: date(2026, 9, 10),
            end_date: date(2026, 9, 11),
            twitter: None,
            hashtag: None,
            website: Some("https://rustconf.example.com".to_string()),
            contact_email: "team@rustconf.example.com".to_string(),
            event_type: EventType::InPerson,
            location: None,
            address1: "Messeplatz 1".to_string(),
            address2: None,
            city: "Cologne".to_string(),
            state_province: "NRW".to_string(),
            postal_code: "50679".to_string(),
            country: "DE".to_string(),
            registration_url: "https://tickets.example.com".to_string(),
            registration_start_date: date(2026, 5, 1),
            registration_end_date: date(2026, 9, 1),
            sessionize_key: None,
            speaker_call_start_date: None,
            speaker_call_end_date: None,
            sponsor_call_start_date: None,
            sponsor_call_end_date: None,
            banner_rights: true,
            banner_attribution: None,
            preview_rights: false,
            preview_attribution: Some(Attribution {
                text: "Photo by A. Painter".to_string(),
                link: "https://gallery.example.com/a".to_string(),
            }),
            banner: image("banner.png"),
            preview: image("preview.png"),
            sponsor_prospectus: vec![],
        }
    }

    fn reference(name: &str, prefix: &str) -> AssetReference {
        AssetReference {
            container: "events".to_string(),
            key: format!("{}/{}", prefix, name),
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            size_bytes: 3,
            content_hash: "abc".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    fn full_references(prefix: &str) -> HashMap<AssetGroup, Vec<AssetReference>> {
        let mut map = HashMap::new();
        map.insert(AssetGroup::Banner, vec![reference("banner.png", prefix)]);
        map.insert(AssetGroup::Preview, vec![reference("preview.png", prefix)]);
        map.insert(
            AssetGroup::SponsorProspectus,
            vec![reference("gold.pdf", prefix), reference("silver.pdf", prefix)],
        );
        map
    }

    #[test]
    fn test_compose_builds_flat_draft_payload() {
        let context = SubmissionContext::generate(&date(2026, 9, 10));
        let references = full_references(&context.storage_path);

        let record = compose(Uuid::new_v4(), &context, &validated_draft(), &references)
            .expect("composes");

        assert_eq!(record.event_id, context.event_id);
        assert_eq!(record.status, EventStatus::Draft);
        assert_eq!(record.payload["title"], "RustConf Rheinland");
        assert_eq!(record.payload["event_type"], "In Person");
        assert_eq!(record.payload["country"], "DE");
        assert_eq!(
            record.payload["banner_img"]["key"],
            format!("{}/banner.png", context.storage_path)
        );
        let sponsors = record.payload["sponsor_prospectus"]
            .as_array()
            .expect("sponsor array");
        assert_eq!(sponsors.len(), 2);
        assert_eq!(sponsors[0]["file_name"], "gold.pdf");
        assert_eq!(sponsors[1]["file_name"], "silver.pdf");
    }

    #[test]
    fn test_compose_omits_absent_optionals() {
        let context = SubmissionContext::generate(&date(2026, 9, 10));
        let references = full_references(&context.storage_path);

        let record = compose(Uuid::new_v4(), &context, &validated_draft(), &references)
            .expect("composes");

        assert!(record.payload.get("tagline").is_none());
        assert!(record.payload.get("speaker_call_start_date").is_none());
        // Rights owned on the banner: no attribution keys
        assert!(record.payload.get("banner_img_attribution_text").is_none());
        // Rights not owned on the preview: attribution carried
        assert_eq!(
            record.payload["preview_img_attribution_text"],
            "Photo by A. Painter"
        );
    }

    #[test]
    fn test_compose_rejects_missing_banner_reference() {
        let context = SubmissionContext::generate(&date(2026, 9, 10));
        let mut references = full_references(&context.storage_path);
        references.insert(AssetGroup::Banner, vec![]);

        let err = compose(Uuid::new_v4(), &context, &validated_draft(), &references)
            .expect_err("must reject");
        assert!(matches!(err, SubmissionError::PayloadRejected(_)));
    }

    #[tokio::test]
    async fn test_persist_retries_then_reports_unavailable() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("pool");
        evhub_common::db::init_schema(&pool).await.expect("schema");
        pool.close().await;

        let context = SubmissionContext::generate(&date(2026, 9, 10));
        let references = full_references(&context.storage_path);
        let record = compose(Uuid::new_v4(), &context, &validated_draft(), &references)
            .expect("composes");

        let err = persist_with_retry(&pool, &record)
            .await
            .expect_err("closed pool must fail");
        assert!(matches!(err, SubmissionError::StoreUnavailable(_)));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::PoolClosed));
        assert!(is_transient(&sqlx::Error::WorkerCrashed));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
