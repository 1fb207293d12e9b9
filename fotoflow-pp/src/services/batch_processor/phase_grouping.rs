//! Phase 1: scan, match, and group a batch's photos
//!
//! Walks the batch in filename order, scanning each photo for an identity
//! marker and folding the outcomes through the grouping cursor. Re-running
//! the phase is safe: counts come from a fresh cursor pass and every photo's
//! attribution is rewritten, so a partial earlier run never double-counts.

use chrono::Utc;
use fotoflow_common::events::{FotoflowEvent, PipelinePhase};
use fotoflow_common::{Error, Result};
use std::path::Path;

use crate::db::logs::LogLevel;
use crate::db::{batches, logs, photos};
use crate::models::{IdentityPayload, Photo};
use crate::services::grouping::{Decision, GroupingCursor, ScanOutcome};
use crate::services::matcher;
use crate::services::qr_decoder::{DecodeMode, QrDecoder};

use super::BatchProcessor;

const PROGRESS_LOG_INTERVAL: usize = 50;

/// Result of scanning one photo for a marker
enum PhotoScan {
    /// File gone from disk; the photo is skipped entirely
    Missing,
    /// File present but undecodable as an image
    Unreadable(String),
    /// An ordinary photo, no identity marker
    Plain,
    /// An identity marker frame
    Marker {
        raw: String,
        payload: IdentityPayload,
    },
}

impl BatchProcessor {
    pub(super) async fn grouping_phase(&self, batch_id: i64) -> Result<()> {
        let wait = self.settings.max_lock_wait_ms;

        let batch = batches::get_batch(&self.db, batch_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("batch {batch_id} not found")))?;

        let batch_photos = photos::list_by_batch_ordered(&self.db, batch_id).await?;
        if batch_photos.is_empty() {
            return Err(Error::InvalidInput(format!(
                "batch {batch_id} has no photos to process"
            )));
        }
        let total = batch_photos.len();

        tracing::info!(batch_id, total, name = %batch.name, "Starting grouping phase");
        self.event_bus.emit_lossy(FotoflowEvent::BatchPhaseStarted {
            batch_id,
            phase: PipelinePhase::Grouping,
            timestamp: Utc::now(),
        });
        logs::append(
            &self.db,
            batch_id,
            wait,
            "grouping_started",
            &format!("Grouping {total} photos"),
            LogLevel::Info,
            None,
            None,
        )
        .await?;

        let mode = if self.settings.thorough_rescan {
            DecodeMode::Thorough
        } else {
            DecodeMode::Fast
        };
        let decoder = QrDecoder::new(self.settings.max_image_dimension, mode);

        let mut cursor = GroupingCursor::new();
        for (index, photo) in batch_photos.iter().enumerate() {
            let action = format!("Scanning {}", photo.filename);
            batches::update_progress(&self.db, batch_id, wait, &action, Some(index as i64)).await?;
            self.event_bus.emit_lossy(FotoflowEvent::BatchProgress {
                batch_id,
                processed: index as u32,
                total: total as u32,
                current_action: action,
                timestamp: Utc::now(),
            });

            match self.scan_photo(&decoder, photo).await? {
                PhotoScan::Missing => {
                    logs::append(
                        &self.db,
                        batch_id,
                        wait,
                        "photo_missing",
                        &format!("File missing on disk, skipped: {}", photo.filename),
                        LogLevel::Warning,
                        None,
                        Some(photo.id),
                    )
                    .await?;
                    continue;
                }
                PhotoScan::Unreadable(reason) => {
                    logs::append(
                        &self.db,
                        batch_id,
                        wait,
                        "photo_unreadable",
                        &format!("Unreadable image, skipped: {}: {reason}", photo.filename),
                        LogLevel::Warning,
                        None,
                        Some(photo.id),
                    )
                    .await?;
                    continue;
                }
                PhotoScan::Marker { raw, payload } => {
                    let matched = matcher::match_payload(&self.db, &payload).await?;
                    let outcome = ScanOutcome::Marker {
                        registration_id: matched.as_ref().map(|(reg, _)| reg.id),
                    };
                    match cursor.advance(outcome) {
                        Decision::StartGroup { registration_id } => {
                            photos::assign_marker(&self.db, photo.id, wait, registration_id, &raw)
                                .await?;
                            // matched is Some whenever the cursor opened a group
                            if let Some((reg, tier)) = matched {
                                logs::append(
                                    &self.db,
                                    batch_id,
                                    wait,
                                    "person_started",
                                    &format!(
                                        "Marker for {} (matched by {})",
                                        reg.display_name(),
                                        tier.as_str()
                                    ),
                                    LogLevel::Info,
                                    Some(registration_id),
                                    Some(photo.id),
                                )
                                .await?;
                            }
                        }
                        Decision::MarkerUnmatched => {
                            photos::mark_unmatched_marker(&self.db, photo.id, wait, &raw).await?;
                            logs::append(
                                &self.db,
                                batch_id,
                                wait,
                                "qr_unmatched",
                                &format!(
                                    "Marker in {} matched no registration (id {})",
                                    photo.filename, payload.registration_id
                                ),
                                LogLevel::Warning,
                                None,
                                Some(photo.id),
                            )
                            .await?;
                        }
                        // Marker outcomes never produce photo decisions
                        Decision::AssignTo { .. } | Decision::LeaveUnattributed => {}
                    }
                }
                PhotoScan::Plain => match cursor.advance(ScanOutcome::NoMarker) {
                    Decision::AssignTo { registration_id } => {
                        photos::assign_owner(&self.db, photo.id, wait, registration_id).await?;
                    }
                    Decision::LeaveUnattributed => {
                        photos::clear_owner(&self.db, photo.id, wait).await?;
                        logs::append(
                            &self.db,
                            batch_id,
                            wait,
                            "photo_unattributed",
                            &format!("No group open for {}", photo.filename),
                            LogLevel::Warning,
                            None,
                            Some(photo.id),
                        )
                        .await?;
                    }
                    Decision::StartGroup { .. } | Decision::MarkerUnmatched => {}
                },
            }

            let done = index + 1;
            if done % PROGRESS_LOG_INTERVAL == 0 {
                logs::append(
                    &self.db,
                    batch_id,
                    wait,
                    "progress_update",
                    &format!("Scanned {done}/{total} photos"),
                    LogLevel::Info,
                    None,
                    None,
                )
                .await?;
            }
        }

        let summary = cursor.summary();
        let people_found = summary.people_found;
        let unmatched = summary.unmatched_photos;
        batches::update_progress(
            &self.db,
            batch_id,
            wait,
            "Grouping complete",
            Some(total as i64),
        )
        .await?;
        batches::finish_grouping(
            &self.db,
            batch_id,
            wait,
            people_found,
            unmatched,
            "Grouping complete, awaiting review",
        )
        .await?;
        logs::append(
            &self.db,
            batch_id,
            wait,
            "grouping_completed",
            &format!("Found {people_found} people, {unmatched} unmatched markers"),
            LogLevel::Info,
            None,
            None,
        )
        .await?;

        tracing::info!(batch_id, people_found, unmatched, "Grouping phase complete");
        self.event_bus
            .emit_lossy(FotoflowEvent::BatchPhaseCompleted {
                batch_id,
                phase: PipelinePhase::Grouping,
                people_found: people_found as u32,
                unmatched_photos: unmatched as u32,
                timestamp: Utc::now(),
            });

        Ok(())
    }

    /// Scan one photo, reusing a stored payload from an earlier run when the
    /// operator has not requested a thorough rescan.
    ///
    /// Image decode is CPU-bound, so it runs on the blocking pool rather
    /// than stalling the runtime worker for seconds per photo.
    async fn scan_photo(&self, decoder: &QrDecoder, photo: &Photo) -> Result<PhotoScan> {
        if !self.settings.thorough_rescan && photo.is_qr_marker {
            if let Some(raw) = photo.qr_payload.as_deref() {
                if let Some(payload) = IdentityPayload::decode(raw) {
                    return Ok(PhotoScan::Marker {
                        raw: raw.to_string(),
                        payload,
                    });
                }
            }
        }

        let decoder = decoder.clone();
        let path = photo.original_path.clone();
        let scanned = tokio::task::spawn_blocking(move || decoder.decode_path(Path::new(&path)))
            .await
            .map_err(|e| Error::Internal(format!("photo scan task failed: {e}")))?;

        Ok(match scanned {
            Ok(scan) => match (scan.payload, scan.raw) {
                (Some(payload), Some(raw)) => PhotoScan::Marker { raw, payload },
                _ => PhotoScan::Plain,
            },
            Err(Error::NotFound(_)) => PhotoScan::Missing,
            Err(Error::Image(reason)) => PhotoScan::Unreadable(reason),
            Err(err) => PhotoScan::Unreadable(err.to_string()),
        })
    }
}
