//! Registration persistence

use chrono::Utc;
use fotoflow_common::Result;
use sqlx::SqlitePool;

use crate::models::Registration;
use crate::utils::retry_on_lock;

const REGISTRATION_COLUMNS: &str = "id, first_name, last_name, email, qr_token, photo_count, \
                                    remote_folder_id, share_link, created_at";

/// Generate a fresh QR token for a new registration
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Create a registration record (intake path and tests)
pub async fn create_registration(
    pool: &SqlitePool,
    first_name: &str,
    last_name: &str,
    email: &str,
    qr_token: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO registrations (first_name, last_name, email, qr_token, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(qr_token)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Exact match on the unique QR token
pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Registration>> {
    let reg = sqlx::query_as::<_, Registration>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE qr_token = ?"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(reg)
}

/// Exact match on the numeric registration id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Registration>> {
    let reg = sqlx::query_as::<_, Registration>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(reg)
}

/// Exact match on the (first name, last name, email) triple.
///
/// Email comparison is case-insensitive; names are exact.
pub async fn find_by_identity(
    pool: &SqlitePool,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<Option<Registration>> {
    let reg = sqlx::query_as::<_, Registration>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM registrations \
         WHERE first_name = ? AND last_name = ? AND LOWER(email) = LOWER(?)"
    ))
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(reg)
}

/// Record delivery results on the registration after Phase 2
pub async fn record_delivery(
    pool: &SqlitePool,
    registration_id: i64,
    max_wait_ms: u64,
    photo_count: i64,
    remote_folder_id: &str,
    share_link: Option<&str>,
) -> Result<()> {
    retry_on_lock("registration delivery record", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE registrations
            SET photo_count = ?, remote_folder_id = ?, share_link = ?
            WHERE id = ?
            "#,
        )
        .bind(photo_count)
        .bind(remote_folder_id)
        .bind(share_link)
        .bind(registration_id)
        .execute(pool)
        .await
        .map_err(fotoflow_common::Error::Database)?;
        Ok(())
    })
    .await
}
