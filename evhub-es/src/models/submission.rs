//! Submission attempt state machine
//!
//! An attempt moves through: VALIDATING → UPLOADING → COMPOSING → SUBMITTED,
//! with terminal detours to REJECTED, UPLOAD_FAILED, CANCELLED and FAILED.
//! The attempt row is re-persisted after every transition so the status
//! endpoint always reflects the latest state.

use chrono::{DateTime, Utc};
use evhub_common::events::SubmissionState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::submission::uploader::UploadFailure;

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub event_id: Uuid,
    pub old_state: SubmissionState,
    pub new_state: SubmissionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Submission attempt (in-memory state)
///
/// Created once the validation gate has passed and the submission context
/// exists; keyed by the context's event id for its whole life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAttempt {
    /// Event identifier minted for this attempt
    pub event_id: Uuid,

    /// Account submitting the draft
    pub owner_id: Uuid,

    /// Current state
    pub state: SubmissionState,

    /// Storage path prefix shared by the attempt's assets
    pub storage_path: String,

    /// Upload progress tracking
    pub progress: SubmissionProgress,

    /// Per-file failures from the upload batch, empty unless UPLOAD_FAILED
    pub upload_failures: Vec<UploadFailure>,

    /// Terminal failure summary, if the attempt did not reach SUBMITTED
    pub error: Option<String>,

    /// Attempt start time
    pub started_at: DateTime<Utc>,

    /// Attempt end time (set on terminal transition)
    pub ended_at: Option<DateTime<Utc>>,
}

/// Upload progress tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionProgress {
    /// Files uploaded so far
    pub uploads_completed: usize,

    /// Total files in the batch
    pub uploads_total: usize,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: f64,

    /// Current operation description
    pub current_operation: String,
}

impl SubmissionAttempt {
    /// Create new attempt in the VALIDATING state
    pub fn new(event_id: Uuid, owner_id: Uuid, storage_path: String) -> Self {
        Self {
            event_id,
            owner_id,
            state: SubmissionState::Validating,
            storage_path,
            progress: SubmissionProgress::default(),
            upload_failures: Vec::new(),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: SubmissionState) -> StateTransition {
        let transition = StateTransition {
            event_id: self.event_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        // Set end time for terminal states
        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Update upload progress
    pub fn update_progress(&mut self, completed: usize, total: usize, operation: String) {
        self.progress.uploads_completed = completed;
        self.progress.uploads_total = total;
        self.progress.percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation;
    }

    /// Record the failures from a failed upload batch
    pub fn record_upload_failures(&mut self, failures: Vec<UploadFailure>) {
        self.upload_failures = failures;
    }

    /// Check if attempt is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Default for SubmissionProgress {
    fn default() -> Self {
        Self {
            uploads_completed: 0,
            uploads_total: 0,
            percentage: 0.0,
            current_operation: String::from("Validating draft"),
        }
    }
}
