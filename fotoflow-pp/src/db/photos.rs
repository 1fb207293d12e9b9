//! Photo persistence
//!
//! The ordered-by-filename query here defines the one total order every
//! pipeline run observes; nothing downstream may reorder photos.

use chrono::Utc;
use fotoflow_common::Result;
use sqlx::SqlitePool;

use crate::models::{Photo, Registration};
use crate::utils::retry_on_lock;

const PHOTO_COLUMNS: &str = "id, batch_id, registration_id, filename, original_path, file_size, \
                             is_qr_marker, qr_payload, processed, uploaded, created_at";

/// Register one uploaded photo for a batch
pub async fn register_photo(
    pool: &SqlitePool,
    batch_id: i64,
    filename: &str,
    original_path: &str,
    file_size: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO photos (batch_id, filename, original_path, file_size, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch_id)
    .bind(filename)
    .bind(original_path)
    .bind(file_size)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All photos of a batch, in filename order (the processing order)
pub async fn list_by_batch_ordered(pool: &SqlitePool, batch_id: i64) -> Result<Vec<Photo>> {
    let photos = sqlx::query_as::<_, Photo>(&format!(
        "SELECT {PHOTO_COLUMNS} FROM photos WHERE batch_id = ? ORDER BY filename"
    ))
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(photos)
}

/// Assign a matched QR-marker photo to its person
pub async fn assign_marker(
    pool: &SqlitePool,
    photo_id: i64,
    max_wait_ms: u64,
    registration_id: i64,
    raw_payload: &str,
) -> Result<()> {
    retry_on_lock("marker photo assignment", max_wait_ms, || async {
        sqlx::query(
            "UPDATE photos SET registration_id = ?, is_qr_marker = 1, qr_payload = ? WHERE id = ?",
        )
        .bind(registration_id)
        .bind(raw_payload)
        .bind(photo_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Flag a QR-marker photo whose payload matched no registration.
///
/// The photo stays unattributed; any stale owner from an earlier run is
/// cleared so re-runs converge.
pub async fn mark_unmatched_marker(
    pool: &SqlitePool,
    photo_id: i64,
    max_wait_ms: u64,
    raw_payload: &str,
) -> Result<()> {
    retry_on_lock("unmatched marker flag", max_wait_ms, || async {
        sqlx::query(
            "UPDATE photos SET registration_id = NULL, is_qr_marker = 1, qr_payload = ? WHERE id = ?",
        )
        .bind(raw_payload)
        .bind(photo_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Assign a non-marker photo to the currently active person.
///
/// Also clears any marker flag from an earlier run; a thorough rescan can
/// demote a photo that previously read as a marker.
pub async fn assign_owner(
    pool: &SqlitePool,
    photo_id: i64,
    max_wait_ms: u64,
    registration_id: i64,
) -> Result<()> {
    retry_on_lock("photo owner assignment", max_wait_ms, || async {
        sqlx::query(
            "UPDATE photos SET registration_id = ?, is_qr_marker = 0, qr_payload = NULL \
             WHERE id = ?",
        )
        .bind(registration_id)
        .bind(photo_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Strip any attribution from a photo, so re-runs converge
pub async fn clear_owner(pool: &SqlitePool, photo_id: i64, max_wait_ms: u64) -> Result<()> {
    retry_on_lock("photo owner clear", max_wait_ms, || async {
        sqlx::query(
            "UPDATE photos SET registration_id = NULL, is_qr_marker = 0, qr_payload = NULL \
             WHERE id = ?",
        )
        .bind(photo_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Mark a photo as materialized into its person's folder
pub async fn mark_processed(pool: &SqlitePool, photo_id: i64, max_wait_ms: u64) -> Result<()> {
    retry_on_lock("photo processed flag", max_wait_ms, || async {
        sqlx::query("UPDATE photos SET processed = 1 WHERE id = ?")
            .bind(photo_id)
            .execute(pool)
            .await
            .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// Mark all of one person's photos in a batch as uploaded
pub async fn mark_uploaded_for_person(
    pool: &SqlitePool,
    batch_id: i64,
    max_wait_ms: u64,
    registration_id: i64,
) -> Result<()> {
    retry_on_lock("photo uploaded flags", max_wait_ms, || async {
        sqlx::query("UPDATE photos SET uploaded = 1 WHERE batch_id = ? AND registration_id = ?")
            .bind(batch_id)
            .bind(registration_id)
            .execute(pool)
            .await
            .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}

/// People with at least one assigned photo in a batch.
///
/// Phase 2 re-derives its worklist from this query, never from Phase 1's
/// in-memory state; the two phases may run in different processes.
pub async fn people_with_photos(pool: &SqlitePool, batch_id: i64) -> Result<Vec<Registration>> {
    let people = sqlx::query_as::<_, Registration>(
        r#"
        SELECT r.id, r.first_name, r.last_name, r.email, r.qr_token,
               r.photo_count, r.remote_folder_id, r.share_link, r.created_at
        FROM registrations r
        WHERE r.id IN (
            SELECT DISTINCT registration_id FROM photos
            WHERE batch_id = ? AND registration_id IS NOT NULL
        )
        ORDER BY r.id
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(people)
}

/// One person's photos within a batch, in filename order
pub async fn list_for_person(
    pool: &SqlitePool,
    batch_id: i64,
    registration_id: i64,
) -> Result<Vec<Photo>> {
    let photos = sqlx::query_as::<_, Photo>(&format!(
        "SELECT {PHOTO_COLUMNS} FROM photos \
         WHERE batch_id = ? AND registration_id = ? ORDER BY filename"
    ))
    .bind(batch_id)
    .bind(registration_id)
    .fetch_all(pool)
    .await?;

    Ok(photos)
}
