//! Data models for evhub-es (Event Submission service)

pub mod country;
pub mod draft;
pub mod submission;

pub use draft::{Attribution, EventDraft, EventStatus, EventType, LocalAsset, ValidatedDraft};
pub use submission::{StateTransition, SubmissionAttempt, SubmissionProgress};
