//! Batch persistence
//!
//! All writes issued while a pipeline worker holds a batch go through
//! `retry_on_lock` so transient SQLite contention never aborts a run.

use chrono::Utc;
use fotoflow_common::Result;
use sqlx::SqlitePool;

use crate::models::{BatchStatus, PhotoBatch};
use crate::utils::retry_on_lock;

/// Create a new batch in the `uploading` state
pub async fn create_batch(pool: &SqlitePool, name: &str) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO photo_batches (name, status, created_at)
        VALUES (?, 'uploading', ?)
        "#,
    )
    .bind(name)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load a batch by id
pub async fn get_batch(pool: &SqlitePool, batch_id: i64) -> Result<Option<PhotoBatch>> {
    let batch = sqlx::query_as::<_, PhotoBatch>(
        r#"
        SELECT id, name, total_photos, processed_photos, total_size_bytes,
               status, current_action, people_found, unmatched_photos,
               started_at, completed_at, error_message, created_at
        FROM photo_batches
        WHERE id = ?
        "#,
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    Ok(batch)
}

/// Mark the batch's upload as finished, recording photo totals
pub async fn finish_upload(
    pool: &SqlitePool,
    batch_id: i64,
    total_photos: i64,
    total_size_bytes: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE photo_batches
        SET status = 'uploaded', total_photos = ?, total_size_bytes = ?
        WHERE id = ?
        "#,
    )
    .bind(total_photos)
    .bind(total_size_bytes)
    .bind(batch_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Compare-and-swap status transition.
///
/// Atomically moves the batch to `to` only if its current status is one of
/// `allowed_from`. Returns false when another worker already advanced the
/// batch, closing the read-then-act race between near-simultaneous triggers.
pub async fn try_transition(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    allowed_from: &[BatchStatus],
    to: BatchStatus,
) -> Result<bool> {
    let placeholders = vec!["?"; allowed_from.len()].join(", ");
    let sql = format!(
        "UPDATE photo_batches SET status = ?, started_at = ?, error_message = NULL \
         WHERE id = ? AND status IN ({placeholders})"
    );

    retry_on_lock("batch status transition", max_wait_ms, || async {
        let mut query = sqlx::query(&sql).bind(to).bind(Utc::now()).bind(batch_id);
        for from in allowed_from {
            query = query.bind(from);
        }

        let result = query
            .execute(pool)
            .await
            .map_err(fotoflow_common::Error::Database)?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

/// Update the live progress fields (best-effort status for pollers)
pub async fn update_progress(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    current_action: &str,
    processed_photos: Option<i64>,
) -> Result<()> {
    retry_on_lock("batch progress update", max_wait_ms, || async {
        match processed_photos {
            Some(processed) => {
                sqlx::query(
                    "UPDATE photo_batches SET current_action = ?, processed_photos = ? WHERE id = ?",
                )
                .bind(current_action)
                .bind(processed)
                .bind(batch_id)
                .execute(pool)
                .await
                .map_err(fotoflow_common::Error::Database)?;
            }
            None => {
                sqlx::query("UPDATE photo_batches SET current_action = ? WHERE id = ?")
                    .bind(current_action)
                    .bind(batch_id)
                    .execute(pool)
                    .await
                    .map_err(fotoflow_common::Error::Database)?;
            }
        }
        Ok(())
    })
    .await
}

/// Record Phase 1 completion: aggregate counts and the review gate
pub async fn finish_grouping(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    people_found: i64,
    unmatched_photos: i64,
    current_action: &str,
) -> Result<()> {
    retry_on_lock("batch grouping completion", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE photo_batches
            SET status = 'awaiting_review', people_found = ?, unmatched_photos = ?,
                current_action = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(people_found)
        .bind(unmatched_photos)
        .bind(current_action)
        .bind(Utc::now())
        .bind(batch_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Record Phase 2 completion
pub async fn finish_delivery(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    current_action: &str,
) -> Result<()> {
    retry_on_lock("batch delivery completion", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE photo_batches
            SET status = 'completed', current_action = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(current_action)
        .bind(Utc::now())
        .bind(batch_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Move the batch to the error state with a stored message.
///
/// Partial progress stays intact for inspection and the batch remains
/// re-runnable. This write must survive transient lock contention: if it
/// were dropped, the batch would be stuck in a phase status that no
/// re-trigger accepts.
pub async fn mark_error(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    message: &str,
) -> Result<()> {
    retry_on_lock("batch error state", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE photo_batches
            SET status = 'error', error_message = ?, current_action = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(message)
        .bind(format!("Processing failed: {message}"))
        .bind(Utc::now())
        .bind(batch_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}
