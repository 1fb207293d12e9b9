//! Event types for the fotoflow event system
//!
//! Provides the shared event definitions and `EventBus` used by the photo
//! pipeline to broadcast live progress to pollers and UI subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline phase identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    /// Phase 1: local attribution of photos to people
    Grouping,
    /// Phase 2: materialization and remote upload
    Delivering,
}

/// Fotoflow event types
///
/// Events are broadcast via `EventBus` and can be serialized for transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FotoflowEvent {
    /// A pipeline phase started for a batch
    BatchPhaseStarted {
        batch_id: i64,
        phase: PipelinePhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress update while a phase is running
    ///
    /// Best-effort only; pollers should treat this as advisory and read the
    /// persisted batch record for authoritative state.
    BatchProgress {
        batch_id: i64,
        processed: u32,
        total: u32,
        current_action: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One person's photo set was delivered to remote storage
    PersonDelivered {
        batch_id: i64,
        registration_id: i64,
        uploaded: u32,
        failed: u32,
        share_link: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline phase completed for a batch
    BatchPhaseCompleted {
        batch_id: i64,
        phase: PipelinePhase,
        people_found: u32,
        unmatched_photos: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline phase failed; the batch is in the error state
    BatchFailed {
        batch_id: i64,
        phase: PipelinePhase,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for pipeline events
///
/// Uses `tokio::sync::broadcast` internally: multiple subscribers, lossy
/// delivery when a subscriber lags beyond the channel capacity.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FotoflowEvent>,
}

impl EventBus {
    /// Create a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FotoflowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the "no subscribers" case
    ///
    /// Progress events are advisory; a pipeline run with nobody listening is
    /// normal and must not fail.
    pub fn emit_lossy(&self, event: FotoflowEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(FotoflowEvent::BatchPhaseStarted {
            batch_id: 7,
            phase: PipelinePhase::Grouping,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            FotoflowEvent::BatchPhaseStarted { batch_id, phase, .. } => {
                assert_eq!(batch_id, 7);
                assert_eq!(phase, PipelinePhase::Grouping);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(FotoflowEvent::PersonDelivered {
            batch_id: 3,
            registration_id: 12,
            uploaded: 5,
            failed: 1,
            share_link: Some("https://share.example.com/abc".to_string()),
            timestamp: chrono::Utc::now(),
        })
        .unwrap();
        assert_eq!(json["type"], "PersonDelivered");
        assert_eq!(json["registration_id"], 12);
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit_lossy(FotoflowEvent::BatchProgress {
            batch_id: 1,
            processed: 0,
            total: 10,
            current_action: "starting".to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
