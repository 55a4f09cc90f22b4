//! Submission attempt persistence
//!
//! The attempt row is rewritten after every state transition; the status
//! endpoint reads whatever the pipeline last saved.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use evhub_common::events::SubmissionState;
use evhub_common::Result;

use crate::models::{SubmissionAttempt, SubmissionProgress};
use crate::submission::UploadFailure;

/// Save a submission attempt, replacing any earlier snapshot of it
pub async fn save_submission(pool: &SqlitePool, attempt: &SubmissionAttempt) -> Result<()> {
    // Prepare all data before touching the pool
    let event_id = attempt.event_id.to_string();
    let owner_id = attempt.owner_id.to_string();
    let state = serde_json::to_string(&attempt.state).map_err(|e| {
        evhub_common::Error::Internal(format!("Failed to serialize state: {}", e))
    })?;
    let upload_failures = serde_json::to_string(&attempt.upload_failures).map_err(|e| {
        evhub_common::Error::Internal(format!("Failed to serialize upload failures: {}", e))
    })?;
    let started_at = attempt.started_at.to_rfc3339();
    let ended_at = attempt.ended_at.map(|dt| dt.to_rfc3339());
    let uploads_completed = attempt.progress.uploads_completed as i64;
    let uploads_total = attempt.progress.uploads_total as i64;
    let current_operation = attempt.progress.current_operation.clone();
    let storage_path = attempt.storage_path.clone();
    let error = attempt.error.clone();

    sqlx::query(
        r#"
        INSERT INTO submissions (
            event_id, owner_id, state, storage_path,
            uploads_completed, uploads_total, current_operation,
            upload_failures, error, started_at, ended_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(event_id) DO UPDATE SET
            state = excluded.state,
            uploads_completed = excluded.uploads_completed,
            uploads_total = excluded.uploads_total,
            current_operation = excluded.current_operation,
            upload_failures = excluded.upload_failures,
            error = excluded.error,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(&event_id)
    .bind(&owner_id)
    .bind(&state)
    .bind(&storage_path)
    .bind(uploads_completed)
    .bind(uploads_total)
    .bind(&current_operation)
    .bind(&upload_failures)
    .bind(&error)
    .bind(&started_at)
    .bind(&ended_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a submission attempt by event id
pub async fn load_submission(
    pool: &SqlitePool,
    event_id: Uuid,
) -> Result<Option<SubmissionAttempt>> {
    let event_id_str = event_id.to_string();

    let row = sqlx::query(
        r#"
        SELECT event_id, owner_id, state, storage_path,
               uploads_completed, uploads_total, current_operation,
               upload_failures, error, started_at, ended_at
        FROM submissions
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

            let state: String = row.get("state");
            let state: SubmissionState = serde_json::from_str(&state).map_err(|e| {
                evhub_common::Error::Internal(format!("Failed to deserialize state: {}", e))
            })?;

            let upload_failures: String = row.get("upload_failures");
            let upload_failures: Vec<UploadFailure> = serde_json::from_str(&upload_failures)
                .map_err(|e| {
                    evhub_common::Error::Internal(format!(
                        "Failed to deserialize upload failures: {}",
                        e
                    ))
                })?;

            let started_at: String = row.get("started_at");
            let started_at = chrono::DateTime::parse_from_rfc3339(&started_at)
                .map_err(|e| {
                    evhub_common::Error::Internal(format!("Failed to parse started_at: {}", e))
                })?
                .with_timezone(&chrono::Utc);

            let ended_at: Option<String> = row.get("ended_at");
            let ended_at = ended_at
                .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
                .transpose()
                .map_err(|e| {
                    evhub_common::Error::Internal(format!("Failed to parse ended_at: {}", e))
                })?
                .map(|dt| dt.with_timezone(&chrono::Utc));

            let uploads_completed = row.get::<i64, _>("uploads_completed") as usize;
            let uploads_total = row.get::<i64, _>("uploads_total") as usize;
            let progress = SubmissionProgress {
                uploads_completed,
                uploads_total,
                // Recomputed on load; not a stored column
                percentage: if uploads_total > 0 {
                    (uploads_completed as f64 / uploads_total as f64) * 100.0
                } else {
                    0.0
                },
                current_operation: row.get("current_operation"),
            };

            Ok(Some(SubmissionAttempt {
                event_id,
                owner_id,
                state,
                storage_path: row.get("storage_path"),
                progress,
                upload_failures,
                error: row.get("error"),
                started_at,
                ended_at,
            }))
        }
        None => Ok(None),
    }
}
