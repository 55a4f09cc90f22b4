//! Submission context generation

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// Identity of one submission attempt
///
/// Generated exactly once per attempt, after the validation gate and
/// before any upload starts. Every asset upload and the final event
/// record share this context; a retry of the same attempt reuses it,
/// while a brand new attempt mints a fresh one.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    /// Event identifier, also the record store key
    pub event_id: Uuid,
    /// Storage path prefix, `<start year>/<event id>`
    pub storage_path: String,
}

impl SubmissionContext {
    /// Mint a fresh context for an attempt
    ///
    /// The path year comes from the event's start date, not from the
    /// submission clock, so assets group under the year the event runs.
    pub fn generate(start_date: &DateTime<Utc>) -> Self {
        let event_id = Uuid::new_v4();
        let storage_path = format!("{}/{}", start_date.year(), event_id);
        Self {
            event_id,
            storage_path,
        }
    }
}
