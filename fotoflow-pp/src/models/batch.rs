//! Batch lifecycle state machine
//!
//! A batch progresses through:
//! uploading → uploaded → grouping → awaiting_review → delivering → completed
//! with `error` reachable from either processing phase. The two phases carry
//! distinct statuses so compare-and-swap transitions are unambiguous.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Batch lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Files are still arriving for this batch
    Uploading,
    /// Upload finished, batch is eligible for Phase 1
    Uploaded,
    /// Phase 1 running: QR scan and sequential attribution
    Grouping,
    /// Phase 1 done; waiting for an operator to confirm the attribution
    AwaitingReview,
    /// Phase 2 running: materialization and remote upload
    Delivering,
    /// Both phases finished
    Completed,
    /// A phase failed; `error_message` holds the cause. Re-runnable.
    Error,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Uploading => "uploading",
            BatchStatus::Uploaded => "uploaded",
            BatchStatus::Grouping => "grouping",
            BatchStatus::AwaitingReview => "awaiting_review",
            BatchStatus::Delivering => "delivering",
            BatchStatus::Completed => "completed",
            BatchStatus::Error => "error",
        }
    }

    /// Statuses from which Phase 1 may be started
    pub fn grouping_entry_states() -> &'static [BatchStatus] {
        &[BatchStatus::Uploaded, BatchStatus::Error]
    }

    /// Statuses from which Phase 2 may be started
    pub fn delivery_entry_states() -> &'static [BatchStatus] {
        &[BatchStatus::AwaitingReview, BatchStatus::Error]
    }
}

/// One photo-upload session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhotoBatch {
    pub id: i64,
    pub name: String,
    pub total_photos: i64,
    pub processed_photos: i64,
    pub total_size_bytes: i64,
    pub status: BatchStatus,
    /// Free-text progress message for live status rendering
    pub current_action: Option<String>,
    pub people_found: i64,
    pub unmatched_photos: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&BatchStatus::AwaitingReview).unwrap();
        assert_eq!(json, "\"awaiting_review\"");
        let back: BatchStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BatchStatus::AwaitingReview);
    }

    #[test]
    fn phase_entry_states() {
        assert!(BatchStatus::grouping_entry_states().contains(&BatchStatus::Uploaded));
        assert!(BatchStatus::grouping_entry_states().contains(&BatchStatus::Error));
        assert!(!BatchStatus::grouping_entry_states().contains(&BatchStatus::Grouping));
        assert!(BatchStatus::delivery_entry_states().contains(&BatchStatus::AwaitingReview));
    }
}
