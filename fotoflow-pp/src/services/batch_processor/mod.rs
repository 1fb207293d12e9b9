//! Batch pipeline orchestrator
//!
//! Owns the two phase runs. Handlers perform the status transition, then
//! spawn a phase on a `BatchProcessor`; any error inside a phase moves the
//! batch to the error state with the message persisted, leaving partial
//! progress intact for inspection and re-run.

mod phase_delivery;
mod phase_grouping;

use chrono::Utc;
use fotoflow_common::config::StorageLayout;
use fotoflow_common::events::{EventBus, FotoflowEvent, PipelinePhase};
use fotoflow_common::Result;
use sqlx::SqlitePool;

use crate::config::PipelineSettings;
use crate::db::batches;
use crate::services::uploader::ObjectStore;

pub struct BatchProcessor {
    pub(crate) db: SqlitePool,
    pub(crate) event_bus: EventBus,
    pub(crate) layout: StorageLayout,
    pub(crate) settings: PipelineSettings,
}

impl BatchProcessor {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        layout: StorageLayout,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            event_bus,
            layout,
            settings,
        }
    }

    /// Run Phase 1 (grouping) to completion.
    ///
    /// The batch must already be in the `grouping` status. On error the
    /// batch moves to `error` before the error propagates to the caller.
    pub async fn run_grouping(&self, batch_id: i64) -> Result<()> {
        match self.grouping_phase(batch_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.record_phase_failure(batch_id, PipelinePhase::Grouping, &err)
                    .await;
                Err(err)
            }
        }
    }

    /// Run Phase 2 (delivery) to completion against the given store.
    ///
    /// The batch must already be in the `delivering` status.
    pub async fn run_delivery(&self, batch_id: i64, store: &dyn ObjectStore) -> Result<()> {
        match self.delivery_phase(batch_id, store).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.record_phase_failure(batch_id, PipelinePhase::Delivering, &err)
                    .await;
                Err(err)
            }
        }
    }

    async fn record_phase_failure(
        &self,
        batch_id: i64,
        phase: PipelinePhase,
        err: &fotoflow_common::Error,
    ) {
        tracing::error!(batch_id, ?phase, "Pipeline phase failed: {err}");
        if let Err(db_err) = batches::mark_error(
            &self.db,
            batch_id,
            self.settings.max_lock_wait_ms,
            &err.to_string(),
        )
        .await
        {
            tracing::error!(batch_id, "Failed to record batch error state: {db_err}");
        }
        self.event_bus.emit_lossy(FotoflowEvent::BatchFailed {
            batch_id,
            phase,
            message: err.to_string(),
            timestamp: Utc::now(),
        });
    }
}
