//! Registration (person) record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pre-existing identity record.
///
/// Read-only from the pipeline's perspective except for `photo_count`,
/// `remote_folder_id` and `share_link`, which Phase 2 fills in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Registration {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Cryptographically unique token embedded in this person's QR marker
    pub qr_token: String,
    pub photo_count: i64,
    pub remote_folder_id: Option<String>,
    pub share_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    /// Display name used in progress messages and logs
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
