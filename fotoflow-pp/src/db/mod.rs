//! Database access for fotoflow-pp
//!
//! Shared SQLite database holding batches, photos, registrations and the
//! processing log.

pub mod batches;
pub mod logs;
pub mod photos;
pub mod registrations;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the pipeline tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photo_batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            total_photos INTEGER NOT NULL DEFAULT 0,
            processed_photos INTEGER NOT NULL DEFAULT 0,
            total_size_bytes INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'uploading',
            current_action TEXT,
            people_found INTEGER NOT NULL DEFAULT 0,
            unmatched_photos INTEGER NOT NULL DEFAULT 0,
            started_at TEXT,
            completed_at TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL REFERENCES photo_batches(id),
            registration_id INTEGER REFERENCES registrations(id),
            filename TEXT NOT NULL,
            original_path TEXT NOT NULL,
            file_size INTEGER NOT NULL DEFAULT 0,
            is_qr_marker INTEGER NOT NULL DEFAULT 0,
            qr_payload TEXT,
            processed INTEGER NOT NULL DEFAULT 0,
            uploaded INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS registrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            qr_token TEXT NOT NULL UNIQUE,
            photo_count INTEGER NOT NULL DEFAULT 0,
            remote_folder_id TEXT,
            share_link TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processing_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL REFERENCES photo_batches(id),
            action TEXT NOT NULL,
            message TEXT NOT NULL,
            level TEXT NOT NULL DEFAULT 'info',
            registration_id INTEGER,
            photo_id INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for idx_sql in [
        "CREATE INDEX IF NOT EXISTS idx_photos_batch_id ON photos(batch_id)",
        "CREATE INDEX IF NOT EXISTS idx_photos_registration_id ON photos(registration_id)",
        "CREATE INDEX IF NOT EXISTS idx_photos_filename ON photos(filename)",
        "CREATE INDEX IF NOT EXISTS idx_processing_log_batch_id ON processing_log(batch_id)",
    ] {
        sqlx::query(idx_sql).execute(pool).await?;
    }

    tracing::info!("Database tables initialized");

    Ok(())
}
