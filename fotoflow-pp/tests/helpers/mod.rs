//! Shared fixtures for integration tests
//!
//! Everything runs against a throwaway data root: real SQLite database,
//! real JPEG/PNG files, real QR markers rendered with the `qrcode` crate.

// Not every test binary uses every helper
#![allow(dead_code)]

use fotoflow_common::config::StorageLayout;
use fotoflow_common::events::EventBus;
use image::{GrayImage, Luma};
use qrcode::QrCode;
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

use fotoflow_pp::config::PipelineSettings;
use fotoflow_pp::db::{self, batches, photos, registrations};
use fotoflow_pp::services::BatchProcessor;

pub struct TestEnv {
    // Held so the data root outlives the test
    #[allow(dead_code)]
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub layout: StorageLayout,
    pub event_bus: EventBus,
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    layout.ensure_base_dirs().unwrap();
    let pool = db::init_database_pool(&layout.database_path()).await.unwrap();
    TestEnv {
        dir,
        pool,
        layout,
        event_bus: EventBus::new(64),
    }
}

impl TestEnv {
    pub fn processor(&self) -> BatchProcessor {
        BatchProcessor::new(
            self.pool.clone(),
            self.event_bus.clone(),
            self.layout.clone(),
            PipelineSettings::default(),
        )
    }

    /// Register a person and return (id, marker payload text)
    pub async fn register_person(&self, first: &str, last: &str, email: &str) -> (i64, String) {
        let token = registrations::generate_token();
        let id = registrations::create_registration(&self.pool, first, last, email, &token)
            .await
            .unwrap();
        (id, format!("{first}|{last}|{email}|{id}|{token}"))
    }

    /// Create a batch and register `files` as its photos, writing each file
    /// into the batch directory. A `Some(payload)` entry becomes a QR marker
    /// frame; `None` becomes a plain gray photo.
    pub async fn seed_batch(&self, name: &str, files: &[(&str, Option<&str>)]) -> i64 {
        let batch_id = batches::create_batch(&self.pool, name).await.unwrap();
        let batch_dir = self.layout.batch_dir(batch_id);
        std::fs::create_dir_all(&batch_dir).unwrap();

        let mut total_size = 0i64;
        for (filename, payload) in files {
            let path = batch_dir.join(filename);
            match payload {
                Some(text) => write_marker(&path, text),
                None => write_plain_photo(&path),
            }
            let size = std::fs::metadata(&path).unwrap().len() as i64;
            total_size += size;
            photos::register_photo(&self.pool, batch_id, filename, &path.to_string_lossy(), size)
                .await
                .unwrap();
        }

        batches::finish_upload(&self.pool, batch_id, files.len() as i64, total_size)
            .await
            .unwrap();
        batch_id
    }
}

/// A plain photo with no QR content
pub fn write_plain_photo(path: &Path) {
    let img = GrayImage::from_fn(320, 240, |x, y| Luma([((x + y) % 200) as u8 + 30]));
    img.save(path).unwrap();
}

/// A QR marker frame carrying `text`
pub fn write_marker(path: &Path, text: &str) {
    let img = QrCode::new(text.as_bytes())
        .unwrap()
        .render::<Luma<u8>>()
        .min_dimensions(300, 300)
        .build();
    img.save(path).unwrap();
}
