//! Phase 2: materialize per-person copies and deliver to remote storage
//!
//! The worklist is re-derived from the photos table, not carried over from
//! Phase 1, so delivery can run in a fresh process after review. People are
//! isolated from each other: one person's failure is logged and the phase
//! moves on.

use chrono::Utc;
use fotoflow_common::events::{FotoflowEvent, PipelinePhase};
use fotoflow_common::{Error, Result};
use std::path::PathBuf;

use crate::db::logs::LogLevel;
use crate::db::{batches, logs, photos, registrations};
use crate::models::Registration;
use crate::services::uploader::{ObjectStore, UploadOrchestrator};

use super::BatchProcessor;

impl BatchProcessor {
    pub(super) async fn delivery_phase(
        &self,
        batch_id: i64,
        store: &dyn ObjectStore,
    ) -> Result<()> {
        let wait = self.settings.max_lock_wait_ms;

        batches::get_batch(&self.db, batch_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("batch {batch_id} not found")))?;

        let people = photos::people_with_photos(&self.db, batch_id).await?;
        let total = people.len();

        tracing::info!(batch_id, people = total, "Starting delivery phase");
        self.event_bus.emit_lossy(FotoflowEvent::BatchPhaseStarted {
            batch_id,
            phase: PipelinePhase::Delivering,
            timestamp: Utc::now(),
        });
        logs::append(
            &self.db,
            batch_id,
            wait,
            "delivery_started",
            &format!("Delivering photos for {total} people"),
            LogLevel::Info,
            None,
            None,
        )
        .await?;

        let orchestrator =
            UploadOrchestrator::new(store, self.settings.remote_parent_folder.clone());
        let mut delivered = 0usize;
        let mut failed_people = 0usize;

        for (index, person) in people.iter().enumerate() {
            let action = format!("Delivering photos for {}", person.display_name());
            batches::update_progress(&self.db, batch_id, wait, &action, None).await?;
            self.event_bus.emit_lossy(FotoflowEvent::BatchProgress {
                batch_id,
                processed: index as u32,
                total: total as u32,
                current_action: action,
                timestamp: Utc::now(),
            });

            if self.deliver_person(batch_id, person, &orchestrator).await? {
                delivered += 1;
            } else {
                failed_people += 1;
            }
        }

        batches::finish_delivery(&self.db, batch_id, wait, "Delivery complete").await?;
        logs::append(
            &self.db,
            batch_id,
            wait,
            "delivery_completed",
            &format!("Delivered {delivered} people, {failed_people} failed"),
            LogLevel::Info,
            None,
            None,
        )
        .await?;

        tracing::info!(batch_id, delivered, failed_people, "Delivery phase complete");
        self.event_bus
            .emit_lossy(FotoflowEvent::BatchPhaseCompleted {
                batch_id,
                phase: PipelinePhase::Delivering,
                people_found: delivered as u32,
                unmatched_photos: 0,
                timestamp: Utc::now(),
            });

        Ok(())
    }

    /// Deliver one person's photos; returns whether the upload succeeded.
    ///
    /// Only database errors propagate. Copy and upload problems are logged
    /// against the batch and contained to this person.
    async fn deliver_person(
        &self,
        batch_id: i64,
        person: &Registration,
        orchestrator: &UploadOrchestrator<'_>,
    ) -> Result<bool> {
        let wait = self.settings.max_lock_wait_ms;
        let person_photos = photos::list_for_person(&self.db, batch_id, person.id).await?;

        let person_dir = self.layout.person_dir(person.id);
        std::fs::create_dir_all(&person_dir)?;

        let mut files: Vec<(String, PathBuf)> = Vec::with_capacity(person_photos.len());
        for photo in &person_photos {
            let dest = person_dir.join(&photo.filename);
            if let Err(err) = std::fs::copy(&photo.original_path, &dest) {
                logs::append(
                    &self.db,
                    batch_id,
                    wait,
                    "photo_copy_failed",
                    &format!("Could not copy {}: {err}", photo.filename),
                    LogLevel::Warning,
                    Some(person.id),
                    Some(photo.id),
                )
                .await?;
                continue;
            }
            photos::mark_processed(&self.db, photo.id, wait).await?;
            files.push((photo.filename.clone(), dest));
        }

        if files.is_empty() {
            logs::append(
                &self.db,
                batch_id,
                wait,
                "delivery_failed",
                &format!("No files materialized for {}", person.display_name()),
                LogLevel::Error,
                Some(person.id),
                None,
            )
            .await?;
            return Ok(false);
        }

        let report = orchestrator.upload_person(person, &files).await;
        if !report.success {
            logs::append(
                &self.db,
                batch_id,
                wait,
                "delivery_failed",
                &format!(
                    "Upload failed for {}: {}",
                    person.display_name(),
                    report.error.as_deref().unwrap_or("unknown error")
                ),
                LogLevel::Error,
                Some(person.id),
                None,
            )
            .await?;
            return Ok(false);
        }

        // success implies the folder exists
        if let Some(folder_id) = report.folder_id.as_deref() {
            registrations::record_delivery(
                &self.db,
                person.id,
                wait,
                report.uploaded,
                folder_id,
                report.share_link.as_deref(),
            )
            .await?;
        }
        photos::mark_uploaded_for_person(&self.db, batch_id, wait, person.id).await?;

        logs::append(
            &self.db,
            batch_id,
            wait,
            "person_delivered",
            &format!(
                "Delivered {} photos for {} ({} failed){}",
                report.uploaded,
                person.display_name(),
                report.failed,
                report
                    .share_link
                    .as_deref()
                    .map(|link| format!(", shared at {link}"))
                    .unwrap_or_default()
            ),
            LogLevel::Info,
            Some(person.id),
            None,
        )
        .await?;
        self.event_bus.emit_lossy(FotoflowEvent::PersonDelivered {
            batch_id,
            registration_id: person.id,
            uploaded: report.uploaded as u32,
            failed: report.failed as u32,
            share_link: report.share_link.clone(),
            timestamp: Utc::now(),
        });

        Ok(true)
    }
}
