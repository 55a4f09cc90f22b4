//! Event types for the EvHub event system
//!
//! Provides shared event definitions and the EventBus used to broadcast
//! submission progress to SSE subscribers and other interested components.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// State of a submission attempt
///
/// Tracks the attempt from the validation gate through upload and
/// composition to a terminal outcome. Every transition is broadcast as a
/// [`SubmissionEvent::SubmissionStateChanged`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    /// Draft is being checked against the validation rules
    Validating,
    /// Validation found rule violations; nothing was uploaded or persisted.
    /// Rejection precedes attempt creation, so the pipeline never stores or
    /// broadcasts this state; the caller gets the violation list instead.
    Rejected,
    /// Asset batch is uploading to the blob store
    Uploading,
    /// At least one asset upload failed; the event record was not written
    UploadFailed,
    /// Attempt was abandoned; upload results were discarded
    Cancelled,
    /// All assets stored; the event record is being composed and persisted
    Composing,
    /// Event record persisted with status Draft
    Submitted,
    /// Record store rejected the payload or stayed unavailable through retries
    Failed,
}

impl SubmissionState {
    /// Check if this is a terminal state (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Rejected
                | SubmissionState::UploadFailed
                | SubmissionState::Cancelled
                | SubmissionState::Submitted
                | SubmissionState::Failed
        )
    }
}

/// EvHub event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SubmissionEvent {
    /// Submission context generated; the attempt now has an identity
    SubmissionStarted {
        /// Event UUID minted for this attempt
        event_id: Uuid,
        /// Account that owns the draft
        owner_id: Uuid,
        /// Storage path prefix all of the attempt's assets share
        storage_path: String,
        /// When the attempt started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Attempt moved to a new state
    SubmissionStateChanged {
        /// Event UUID of the attempt
        event_id: Uuid,
        /// State before the transition
        old_state: SubmissionState,
        /// State after the transition
        new_state: SubmissionState,
        /// When the transition happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One asset finished uploading to the blob store
    AssetUploaded {
        /// Event UUID of the attempt
        event_id: Uuid,
        /// Asset group the file belongs to ("banner", "preview", "sponsor_prospectus")
        group: String,
        /// Original file name as supplied by the client
        file_name: String,
        /// When the upload completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Event record persisted; the attempt succeeded
    SubmissionCompleted {
        /// Event UUID now present in the record store
        event_id: Uuid,
        /// When the record was persisted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Attempt ended in a failure state
    SubmissionFailed {
        /// Event UUID of the attempt
        event_id: Uuid,
        /// Human-readable failure summary
        error: String,
        /// When the attempt failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SubmissionEvent {
    /// Get event type name for SSE transmission
    pub fn event_type(&self) -> &str {
        match self {
            SubmissionEvent::SubmissionStarted { .. } => "SubmissionStarted",
            SubmissionEvent::SubmissionStateChanged { .. } => "SubmissionStateChanged",
            SubmissionEvent::AssetUploaded { .. } => "AssetUploaded",
            SubmissionEvent::SubmissionCompleted { .. } => "SubmissionCompleted",
            SubmissionEvent::SubmissionFailed { .. } => "SubmissionFailed",
        }
    }
}

/// Broadcast bus for submission events
///
/// Wraps a tokio broadcast channel. Slow subscribers that fall more than
/// `capacity` events behind start losing the oldest events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SubmissionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers the event reached. An event with
    /// no listeners is dropped; emission never blocks the pipeline.
    pub fn emit(&self, event: SubmissionEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Channel capacity this bus was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_subscribe_round_trip() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event_id = Uuid::new_v4();
        let reached = bus.emit(SubmissionEvent::SubmissionCompleted {
            event_id,
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(reached, 1);

        match rx.recv().await.expect("event should arrive") {
            SubmissionEvent::SubmissionCompleted { event_id: id, .. } => {
                assert_eq!(id, event_id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_reaches_nobody() {
        let bus = EventBus::new(16);
        let reached = bus.emit(SubmissionEvent::SubmissionFailed {
            event_id: Uuid::new_v4(),
            error: "record store unavailable".to_string(),
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(reached, 0);
    }

    #[test]
    fn test_event_serialization_carries_type_tag() {
        let event = SubmissionEvent::SubmissionStateChanged {
            event_id: Uuid::new_v4(),
            old_state: SubmissionState::Uploading,
            new_state: SubmissionState::Composing,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["type"], "SubmissionStateChanged");
        assert_eq!(json["old_state"], "UPLOADING");
        assert_eq!(json["new_state"], "COMPOSING");
        assert_eq!(event.event_type(), "SubmissionStateChanged");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SubmissionState::Validating.is_terminal());
        assert!(!SubmissionState::Uploading.is_terminal());
        assert!(!SubmissionState::Composing.is_terminal());
        assert!(SubmissionState::Rejected.is_terminal());
        assert!(SubmissionState::UploadFailed.is_terminal());
        assert!(SubmissionState::Cancelled.is_terminal());
        assert!(SubmissionState::Submitted.is_terminal());
        assert!(SubmissionState::Failed.is_terminal());
    }
}
