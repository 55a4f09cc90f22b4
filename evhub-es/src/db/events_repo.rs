//! Event record persistence
//!
//! One row per event, keyed by event id. Writing is an upsert, so
//! retrying a submission with the same context lands on the same row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use evhub_common::Result;

use crate::models::EventStatus;
use crate::submission::EventRecord;

/// Event record as read back from the store
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub owner_id: Uuid,
    pub status: EventStatus,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write an event record, replacing any existing row with the same id
///
/// `created_at` survives the conflict update so the row keeps its
/// original creation time across retries.
pub async fn upsert_event(pool: &SqlitePool, record: &EventRecord) -> Result<()> {
    let event_id = record.event_id.to_string();
    let owner_id = record.owner_id.to_string();
    let status = record.status.as_str();
    let payload = serde_json::to_string(&record.payload).map_err(|e| {
        evhub_common::Error::Internal(format!("Failed to serialize payload: {}", e))
    })?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO events (event_id, owner_id, status, payload, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(event_id) DO UPDATE SET
            owner_id = excluded.owner_id,
            status = excluded.status,
            payload = excluded.payload,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&event_id)
    .bind(&owner_id)
    .bind(status)
    .bind(&payload)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load an event record by id
pub async fn load_event(pool: &SqlitePool, event_id: Uuid) -> Result<Option<StoredEvent>> {
    let event_id_str = event_id.to_string();

    let row = sqlx::query(
        r#"
        SELECT event_id, owner_id, status, payload, created_at, updated_at
        FROM events
        WHERE event_id = ?
        "#,
    )
    .bind(event_id_str)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let owner_id: String = row.get("owner_id");
            let owner_id = Uuid::parse_str(&owner_id).map_err(|e| {
                evhub_common::Error::Internal(format!("Failed to parse owner_id: {}", e))
            })?;

            let status: String = row.get("status");
            let status = EventStatus::from_str(&status).map_err(|_| {
                evhub_common::Error::Internal(format!("Unknown event status: {}", status))
            })?;

            let payload: String = row.get("payload");
            let payload: serde_json::Value = serde_json::from_str(&payload).map_err(|e| {
                evhub_common::Error::Internal(format!("Failed to deserialize payload: {}", e))
            })?;

            let created_at: String = row.get("created_at");
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| {
                    evhub_common::Error::Internal(format!("Failed to parse created_at: {}", e))
                })?
                .with_timezone(&Utc);

            let updated_at: String = row.get("updated_at");
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| {
                    evhub_common::Error::Internal(format!("Failed to parse updated_at: {}", e))
                })?
                .with_timezone(&Utc);

            Ok(Some(StoredEvent {
                event_id,
                owner_id,
                status,
                payload,
                created_at,
                updated_at,
            }))
        }
        None => Ok(None),
    }
}

/// Count stored event records
pub async fn count_events(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
