//! Event submission API handlers
//!
//! POST /events runs the whole pipeline inside the request: the response
//! carries the attempt's outcome, so the client never polls to learn
//! whether its draft landed. A dropped connection cancels the attempt
//! through the token's drop guard.

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use evhub_common::events::SubmissionState;

use crate::api::auth::OwnerId;
use crate::error::{ApiError, ApiResult};
use crate::models::{EventDraft, LocalAsset, SubmissionProgress};
use crate::submission::{SubmissionPipeline, UploadFailure};
use crate::AppState;

/// POST /events response
#[derive(Debug, Serialize)]
pub struct SubmitEventResponse {
    pub event_id: Uuid,
    pub state: SubmissionState,
}

/// GET /events/{id}/submission response
#[derive(Debug, Serialize)]
pub struct SubmissionStatusResponse {
    pub event_id: Uuid,
    pub state: SubmissionState,
    pub storage_path: String,
    pub progress: SubmissionProgress,
    pub upload_failures: Vec<UploadFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// POST /events/{id}/submission/cancel response
///
/// `state` is the attempt's state when the cancel was requested; the
/// CANCELLED transition itself lands at the next phase boundary.
#[derive(Debug, Serialize)]
pub struct CancelSubmissionResponse {
    pub event_id: Uuid,
    pub state: SubmissionState,
    pub cancelled_at: DateTime<Utc>,
}

/// POST /events
///
/// Submit an event draft as multipart form data: one `draft` JSON part
/// plus `banner`, `preview` and repeated `sponsor_prospectus` file parts.
/// Returns 201 with the minted event id, 422 for validation failures,
/// 502 when uploads fail, 503 when the record store stays unavailable.
pub async fn submit_event(
    State(state): State<AppState>,
    owner: OwnerId,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmitEventResponse>)> {
    let draft = decode_draft(multipart).await?;

    // Dropping the guard cancels the token, so a client that disconnects
    // mid-request abandons its attempt
    let cancel_token = CancellationToken::new();
    let guard = cancel_token.clone().drop_guard();

    let pipeline = SubmissionPipeline::new(
        state.db.clone(),
        state.blob_store.clone(),
        state.event_bus.clone(),
        state.cancellation_tokens.clone(),
    );
    let event_id = pipeline
        .submit(owner.as_uuid(), draft, cancel_token)
        .await?;
    guard.disarm();

    Ok((
        StatusCode::CREATED,
        Json(SubmitEventResponse {
            event_id,
            state: SubmissionState::Submitted,
        }),
    ))
}

/// GET /events/{event_id}/submission
///
/// Report the current state of a submission attempt. Other owners'
/// attempts answer 404 rather than 403.
pub async fn get_submission_status(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<SubmissionStatusResponse>> {
    let attempt = crate::db::submissions::load_submission(&state.db, event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", event_id)))?;

    if attempt.owner_id != owner.as_uuid() {
        return Err(ApiError::NotFound(format!(
            "Submission not found: {}",
            event_id
        )));
    }

    tracing::debug!(event_id = %event_id, state = ?attempt.state, "Status query");

    Ok(Json(SubmissionStatusResponse {
        event_id: attempt.event_id,
        state: attempt.state,
        storage_path: attempt.storage_path,
        progress: attempt.progress,
        upload_failures: attempt.upload_failures,
        error: attempt.error,
        started_at: attempt.started_at,
        ended_at: attempt.ended_at,
    }))
}

/// POST /events/{event_id}/submission/cancel
///
/// Cancel an in-flight submission attempt through its registered token.
pub async fn cancel_submission(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<CancelSubmissionResponse>> {
    let attempt = crate::db::submissions::load_submission(&state.db, event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", event_id)))?;

    if attempt.owner_id != owner.as_uuid() {
        return Err(ApiError::NotFound(format!(
            "Submission not found: {}",
            event_id
        )));
    }

    if attempt.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Submission already in terminal state: {:?}",
            attempt.state
        )));
    }

    let token = state
        .cancellation_tokens
        .read()
        .await
        .get(&event_id)
        .cloned();
    match token {
        Some(token) => {
            token.cancel();
            tracing::info!(event_id = %event_id, "Submission cancel requested");
            Ok(Json(CancelSubmissionResponse {
                event_id,
                state: attempt.state,
                cancelled_at: Utc::now(),
            }))
        }
        None => Err(ApiError::Conflict(format!(
            "Submission no longer in flight: {}",
            event_id
        ))),
    }
}

/// Decode the multipart submission body into a draft with its assets
async fn decode_draft(mut multipart: Multipart) -> Result<EventDraft, ApiError> {
    let mut draft: Option<EventDraft> = None;
    let mut banner: Option<LocalAsset> = None;
    let mut preview: Option<LocalAsset> = None;
    let mut sponsor_prospectus: Vec<LocalAsset> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "draft" => {
                if draft.is_some() {
                    return Err(ApiError::BadRequest("Duplicate draft part".to_string()));
                }
                let text = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read draft part: {}", e))
                })?;
                draft = Some(serde_json::from_str(&text).map_err(|e| {
                    ApiError::BadRequest(format!("Invalid draft JSON: {}", e))
                })?);
            }
            "banner" => {
                if banner.is_some() {
                    return Err(ApiError::BadRequest("Duplicate banner part".to_string()));
                }
                banner = read_file_field(field).await?;
            }
            "preview" => {
                if preview.is_some() {
                    return Err(ApiError::BadRequest("Duplicate preview part".to_string()));
                }
                preview = read_file_field(field).await?;
            }
            "sponsor_prospectus" => {
                if let Some(asset) = read_file_field(field).await? {
                    sponsor_prospectus.push(asset);
                }
            }
            other => {
                tracing::warn!(part = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let mut draft =
        draft.ok_or_else(|| ApiError::BadRequest("Missing draft part".to_string()))?;
    draft.banner = banner;
    draft.preview = preview;
    draft.sponsor_prospectus = sponsor_prospectus;
    Ok(draft)
}

/// Read one file part; an unselected file input arrives as an empty part
/// with no name and decodes to `None`
async fn read_file_field(field: Field<'_>) -> Result<Option<LocalAsset>, ApiError> {
    let file_name = field.file_name().map(str::to_string).unwrap_or_default();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read file part: {}", e)))?;

    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(LocalAsset::new(file_name, content_type, bytes)))
}

/// Build event submission routes
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(submit_event))
        .route("/events/:event_id/submission", get(get_submission_status))
        .route(
            "/events/:event_id/submission/cancel",
            post(cancel_submission),
        )
}
