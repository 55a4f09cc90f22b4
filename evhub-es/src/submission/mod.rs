//! Submission pipeline
//!
//! Coordinates one submission attempt through all states:
//! VALIDATING → UPLOADING → COMPOSING → SUBMITTED
//!
//! Validation rejections happen before an attempt exists, so a rejected
//! draft leaves nothing behind. Once the context is generated the attempt
//! is persisted after every transition and its cancellation token stays
//! registered until the attempt ends.

pub mod composer;
pub mod context;
pub mod uploader;

pub use composer::EventRecord;
pub use context::SubmissionContext;
pub use uploader::{AssetGroup, UploadFailure};

use chrono::Utc;
use evhub_common::events::{EventBus, SubmissionEvent, SubmissionState};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{EventDraft, LocalAsset, StateTransition, SubmissionAttempt, ValidatedDraft};
use crate::storage::{BlobStore, EVENT_ASSET_CONTAINER};
use crate::validate::FieldErrors;

/// Cancellation tokens for attempts still in flight, keyed by event id
pub type CancellationTokens = Arc<RwLock<HashMap<Uuid, CancellationToken>>>;

/// Why a submission attempt did not reach SUBMITTED
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Draft failed the validation gate; nothing was uploaded or stored
    #[error("{0}")]
    Validation(FieldErrors),

    /// One or more files failed to upload; every file was still attempted
    #[error("{} upload(s) failed", .0.len())]
    Upload(Vec<UploadFailure>),

    /// Record store unreachable after retries; safe to resubmit later
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    /// Record store refused the composed payload
    #[error("record store rejected payload: {0}")]
    PayloadRejected(String),

    /// Attempt was cancelled before the record was written
    #[error("submission cancelled")]
    Cancelled,
}

/// Submission pipeline service
pub struct SubmissionPipeline {
    db: SqlitePool,
    store: Arc<dyn BlobStore>,
    event_bus: EventBus,
    container: String,
    cancellation_tokens: CancellationTokens,
}

impl SubmissionPipeline {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn BlobStore>,
        event_bus: EventBus,
        cancellation_tokens: CancellationTokens,
    ) -> Self {
        Self {
            db,
            store,
            event_bus,
            container: EVENT_ASSET_CONTAINER.to_string(),
            cancellation_tokens,
        }
    }

    /// Run one submission attempt to completion
    ///
    /// Returns the minted event id on success. The caller owns the
    /// cancellation token; cancelling it (or an explicit cancel through
    /// the registered token) ends the attempt at the next phase boundary.
    /// In-flight uploads run to completion but their results are
    /// discarded, and the composer never runs for a cancelled attempt.
    pub async fn submit(
        &self,
        owner_id: Uuid,
        draft: EventDraft,
        cancel_token: CancellationToken,
    ) -> Result<Uuid, SubmissionError> {
        // Validation gate: all failures collected, nothing persisted
        let validated = crate::validate::validate(draft).map_err(SubmissionError::Validation)?;

        // Context minted exactly once per attempt
        let context = SubmissionContext::generate(&validated.start_date);
        let mut attempt =
            SubmissionAttempt::new(context.event_id, owner_id, context.storage_path.clone());

        tracing::info!(
            event_id = %context.event_id,
            owner_id = %owner_id,
            storage_path = %context.storage_path,
            "Starting submission attempt"
        );

        self.register_token(context.event_id, cancel_token.clone()).await;
        let result = self
            .run_attempt(owner_id, &context, validated, &mut attempt, &cancel_token)
            .await;
        self.deregister_token(context.event_id).await;

        result.map(|_| context.event_id)
    }

    async fn run_attempt(
        &self,
        owner_id: Uuid,
        context: &SubmissionContext,
        draft: ValidatedDraft,
        attempt: &mut SubmissionAttempt,
        cancel_token: &CancellationToken,
    ) -> Result<(), SubmissionError> {
        self.save_attempt(attempt).await;
        self.event_bus.emit(SubmissionEvent::SubmissionStarted {
            event_id: context.event_id,
            owner_id,
            storage_path: context.storage_path.clone(),
            timestamp: Utc::now(),
        });

        // Phase: UPLOADING
        let total = 2 + draft.sponsor_prospectus.len();
        let change = attempt.transition_to(SubmissionState::Uploading);
        attempt.update_progress(0, total, format!("Uploading {} file(s)", total));
        self.save_attempt(attempt).await;
        self.emit_state_change(change);

        if cancel_token.is_cancelled() {
            return self.cancel_attempt(attempt).await;
        }

        let groups: Vec<(AssetGroup, &[LocalAsset])> = vec![
            (AssetGroup::Banner, std::slice::from_ref(&draft.banner)),
            (AssetGroup::Preview, std::slice::from_ref(&draft.preview)),
            (
                AssetGroup::SponsorProspectus,
                draft.sponsor_prospectus.as_slice(),
            ),
        ];
        let upload_result = uploader::upload_assets(
            self.store.as_ref(),
            &self.container,
            &context.storage_path,
            context.event_id,
            &groups,
            &self.event_bus,
        )
        .await;

        // Uploads already in flight were allowed to finish; a cancelled
        // attempt discards whatever they produced
        if cancel_token.is_cancelled() {
            return self.cancel_attempt(attempt).await;
        }

        let references = match upload_result {
            Ok(references) => references,
            Err(failures) => {
                tracing::warn!(
                    event_id = %context.event_id,
                    failed = failures.len(),
                    total,
                    "Upload batch failed"
                );
                attempt.record_upload_failures(failures.clone());
                attempt.error = Some(format!("{} of {} upload(s) failed", failures.len(), total));
                let change = attempt.transition_to(SubmissionState::UploadFailed);
                self.save_attempt(attempt).await;
                self.emit_state_change(change);
                self.event_bus.emit(SubmissionEvent::SubmissionFailed {
                    event_id: context.event_id,
                    error: format!("{} of {} upload(s) failed", failures.len(), total),
                    timestamp: Utc::now(),
                });
                return Err(SubmissionError::Upload(failures));
            }
        };

        // Phase: COMPOSING
        let change = attempt.transition_to(SubmissionState::Composing);
        attempt.update_progress(total, total, "Composing event record".to_string());
        self.save_attempt(attempt).await;
        self.emit_state_change(change);

        let record = match composer::compose(owner_id, context, &draft, &references) {
            Ok(record) => record,
            Err(error) => return self.fail_attempt(attempt, error).await,
        };
        if let Err(error) = composer::persist_with_retry(&self.db, &record).await {
            return self.fail_attempt(attempt, error).await;
        }

        // Phase: SUBMITTED
        let change = attempt.transition_to(SubmissionState::Submitted);
        attempt.update_progress(total, total, "Submission complete".to_string());
        self.save_attempt(attempt).await;
        self.emit_state_change(change);
        self.event_bus.emit(SubmissionEvent::SubmissionCompleted {
            event_id: context.event_id,
            timestamp: Utc::now(),
        });

        tracing::info!(
            event_id = %context.event_id,
            storage_path = %context.storage_path,
            "Event record submitted"
        );

        Ok(())
    }

    async fn cancel_attempt(
        &self,
        attempt: &mut SubmissionAttempt,
    ) -> Result<(), SubmissionError> {
        tracing::info!(event_id = %attempt.event_id, "Submission attempt cancelled");
        let change = attempt.transition_to(SubmissionState::Cancelled);
        self.save_attempt(attempt).await;
        self.emit_state_change(change);
        Err(SubmissionError::Cancelled)
    }

    async fn fail_attempt(
        &self,
        attempt: &mut SubmissionAttempt,
        error: SubmissionError,
    ) -> Result<(), SubmissionError> {
        tracing::error!(
            event_id = %attempt.event_id,
            error = %error,
            "Submission attempt failed"
        );
        attempt.error = Some(error.to_string());
        let change = attempt.transition_to(SubmissionState::Failed);
        self.save_attempt(attempt).await;
        self.emit_state_change(change);
        self.event_bus.emit(SubmissionEvent::SubmissionFailed {
            event_id: attempt.event_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        Err(error)
    }

    fn emit_state_change(&self, change: StateTransition) {
        self.event_bus.emit(SubmissionEvent::SubmissionStateChanged {
            event_id: change.event_id,
            old_state: change.old_state,
            new_state: change.new_state,
            timestamp: change.transitioned_at,
        });
    }

    /// Attempt-row persistence is observability; the submission outcome
    /// reflects only the record store
    async fn save_attempt(&self, attempt: &SubmissionAttempt) {
        if let Err(error) = crate::db::submissions::save_submission(&self.db, attempt).await {
            tracing::warn!(
                event_id = %attempt.event_id,
                error = %error,
                "Failed to persist attempt record (non-fatal, continuing)"
            );
        }
    }

    async fn register_token(&self, event_id: Uuid, token: CancellationToken) {
        self.cancellation_tokens.write().await.insert(event_id, token);
    }

    async fn deregister_token(&self, event_id: Uuid) {
        self.cancellation_tokens.write().await.remove(&event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;

    fn failure(file_name: &str) -> UploadFailure {
        UploadFailure {
            group: AssetGroup::SponsorProspectus,
            file_name: file_name.to_string(),
            error: StoreError::Unavailable("disk full".to_string()),
        }
    }

    #[test]
    fn test_upload_error_message_counts_failures() {
        let err = SubmissionError::Upload(vec![failure("gold.pdf"), failure("silver.pdf")]);
        assert_eq!(err.to_string(), "2 upload(s) failed");
    }

    #[test]
    fn test_cancelled_and_unavailable_messages() {
        assert_eq!(
            SubmissionError::Cancelled.to_string(),
            "submission cancelled"
        );
        assert_eq!(
            SubmissionError::StoreUnavailable("pool closed".to_string()).to_string(),
            "record store unavailable: pool closed"
        );
    }
}
