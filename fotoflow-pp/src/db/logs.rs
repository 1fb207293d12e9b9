//! Append-only processing log
//!
//! Every noteworthy pipeline action is recorded here for the review UI and
//! mirrored to the tracing subscriber at a matching level.

use chrono::{DateTime, Utc};
use fotoflow_common::Result;
use sqlx::SqlitePool;

use crate::utils::retry_on_lock;

/// Severity of a processing log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// One row of the processing log
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub batch_id: i64,
    pub action: String,
    pub message: String,
    pub level: String,
    pub registration_id: Option<i64>,
    pub photo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Append an entry to a batch's processing log
pub async fn append(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    action: &str,
    message: &str,
    level: LogLevel,
    registration_id: Option<i64>,
    photo_id: Option<i64>,
) -> Result<()> {
    match level {
        LogLevel::Info => tracing::info!(batch_id, action, "{}", message),
        LogLevel::Warning => tracing::warn!(batch_id, action, "{}", message),
        LogLevel::Error => tracing::error!(batch_id, action, "{}", message),
    }

    retry_on_lock("processing log append", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO processing_log
                (batch_id, action, message, level, registration_id, photo_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_id)
        .bind(action)
        .bind(message)
        .bind(level.as_str())
        .bind(registration_id)
        .bind(photo_id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// All log entries for a batch, oldest first
pub async fn list_for_batch(pool: &SqlitePool, batch_id: i64) -> Result<Vec<LogEntry>> {
    let entries = sqlx::query_as::<_, LogEntry>(
        r#"
        SELECT id, batch_id, action, message, level, registration_id, photo_id, created_at
        FROM processing_log
        WHERE batch_id = ?
        ORDER BY id
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
