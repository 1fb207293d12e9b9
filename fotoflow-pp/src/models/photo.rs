//! Photo record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One image file belonging to exactly one batch.
///
/// `filename` is the authoritative sort key: camera-assigned names preserve
/// capture order, and attribution is strictly a function of that order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub batch_id: i64,
    /// Owning person; NULL means unattributed
    pub registration_id: Option<i64>,
    pub filename: String,
    pub original_path: String,
    pub file_size: i64,
    /// True if this photo carried a decoded QR marker
    pub is_qr_marker: bool,
    /// Raw decoded QR payload, when a marker was found
    pub qr_payload: Option<String>,
    /// Set once the photo was materialized into its person's folder
    pub processed: bool,
    /// Set once the photo landed in remote storage
    pub uploaded: bool,
    pub created_at: DateTime<Utc>,
}
