//! Pipeline settings
//!
//! Settings live in the `settings` table so operators can tune the pipeline
//! without redeploying. Every value has a compiled default; the environment
//! provides the remote-storage credential fallback.

use fotoflow_common::Result;
use sqlx::SqlitePool;

/// Default ceiling for the longest image dimension before decode
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 1200;

/// Default total wait budget for lock-contention retries
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Runtime pipeline settings, loaded once per phase run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Images above this dimension are downscaled before QR decode
    pub max_image_dimension: u32,
    /// Total wait budget for database lock retries
    pub max_lock_wait_ms: u64,
    /// Run the full preprocessing ladder instead of fast mode
    pub thorough_rescan: bool,
    /// Optional remote parent folder id for per-person folders
    pub remote_parent_folder: Option<String>,
    /// Remote object-store endpoint
    pub remote_base_url: Option<String>,
    /// Remote object-store bearer token
    pub remote_token: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
            thorough_rescan: false,
            remote_parent_folder: None,
            remote_base_url: None,
            remote_token: None,
        }
    }
}

impl PipelineSettings {
    /// Load settings from the database, falling back to defaults.
    ///
    /// The remote token may also come from `FOTOFLOW_REMOTE_TOKEN` so that
    /// credentials can stay out of the database.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let max_image_dimension = get_setting(pool, "pp_max_image_dimension")
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_image_dimension);

        let max_lock_wait_ms = get_setting(pool, "pp_database_max_lock_wait_ms")
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_lock_wait_ms);

        let thorough_rescan = get_setting(pool, "pp_thorough_rescan")
            .await?
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.thorough_rescan);

        let remote_parent_folder = get_setting(pool, "pp_remote_parent_folder").await?;
        let remote_base_url = get_setting(pool, "pp_remote_base_url").await?;
        let remote_token = match get_setting(pool, "pp_remote_token").await? {
            Some(token) => Some(token),
            None => std::env::var("FOTOFLOW_REMOTE_TOKEN").ok(),
        };

        Ok(Self {
            max_image_dimension,
            max_lock_wait_ms,
            thorough_rescan,
            remote_parent_folder,
            remote_base_url,
            remote_token,
        })
    }
}

/// Read a single setting value, `None` when unset
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Write a single setting value (upsert)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}
