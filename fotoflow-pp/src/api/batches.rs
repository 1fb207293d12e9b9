//! Batch lifecycle endpoints
//!
//! The status transition happens synchronously in the handler via
//! compare-and-swap, so two near-simultaneous triggers resolve to exactly
//! one worker; the loser gets 409. The phase itself runs in a spawned task.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::config::PipelineSettings;
use crate::db::batches;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchStatus, PhotoBatch};
use crate::services::remote::HttpObjectStore;
use crate::services::BatchProcessor;
use crate::AppState;

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batches/:batch_id/process", post(start_grouping))
        .route("/batches/:batch_id/deliver", post(start_delivery))
        .route("/batches/:batch_id/progress", get(get_progress))
}

/// POST /batches/:id/process - start Phase 1 (grouping)
async fn start_grouping(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let batch = batches::get_batch(&state.db, batch_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batch {batch_id} not found")))?;

    let settings = PipelineSettings::load(&state.db).await?;
    let transitioned = batches::try_transition(
        &state.db,
        batch_id,
        settings.max_lock_wait_ms,
        BatchStatus::grouping_entry_states(),
        BatchStatus::Grouping,
    )
    .await?;
    if !transitioned {
        return Err(ApiError::Conflict(format!(
            "batch {batch_id} is '{}', grouping requires 'uploaded' or 'error'",
            batch.status.as_str()
        )));
    }
    let processor = BatchProcessor::new(
        state.db.clone(),
        state.event_bus.clone(),
        state.layout.clone(),
        settings,
    );
    let last_error = state.last_error.clone();
    tokio::spawn(async move {
        if let Err(err) = processor.run_grouping(batch_id).await {
            *last_error.write().await = Some(err.to_string());
        }
    });

    tracing::info!(batch_id, "Grouping phase accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "batch_id": batch_id, "status": "grouping" })),
    ))
}

/// POST /batches/:id/deliver - start Phase 2 (delivery)
async fn start_delivery(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let batch = batches::get_batch(&state.db, batch_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batch {batch_id} not found")))?;

    // Validate remote configuration before taking the batch
    let settings = PipelineSettings::load(&state.db).await?;
    let (base_url, token) = match (&settings.remote_base_url, &settings.remote_token) {
        (Some(base_url), Some(token)) => (base_url.clone(), token.clone()),
        _ => {
            return Err(ApiError::BadRequest(
                "remote storage is not configured (pp_remote_base_url / pp_remote_token)"
                    .to_string(),
            ));
        }
    };

    let transitioned = batches::try_transition(
        &state.db,
        batch_id,
        settings.max_lock_wait_ms,
        BatchStatus::delivery_entry_states(),
        BatchStatus::Delivering,
    )
    .await?;
    if !transitioned {
        return Err(ApiError::Conflict(format!(
            "batch {batch_id} is '{}', delivery requires 'awaiting_review' or 'error'",
            batch.status.as_str()
        )));
    }

    let processor = BatchProcessor::new(
        state.db.clone(),
        state.event_bus.clone(),
        state.layout.clone(),
        settings,
    );
    let last_error = state.last_error.clone();
    tokio::spawn(async move {
        let store = HttpObjectStore::new(base_url, token);
        if let Err(err) = processor.run_delivery(batch_id, &store).await {
            *last_error.write().await = Some(err.to_string());
        }
    });

    tracing::info!(batch_id, "Delivery phase accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "batch_id": batch_id, "status": "delivering" })),
    ))
}

/// Progress snapshot for pollers
#[derive(Debug, Serialize)]
struct ProgressResponse {
    batch_id: i64,
    name: String,
    status: BatchStatus,
    current_action: Option<String>,
    processed_photos: i64,
    total_photos: i64,
    people_found: i64,
    unmatched_photos: i64,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<PhotoBatch> for ProgressResponse {
    fn from(batch: PhotoBatch) -> Self {
        Self {
            batch_id: batch.id,
            name: batch.name,
            status: batch.status,
            current_action: batch.current_action,
            processed_photos: batch.processed_photos,
            total_photos: batch.total_photos,
            people_found: batch.people_found,
            unmatched_photos: batch.unmatched_photos,
            error_message: batch.error_message,
            started_at: batch.started_at,
            completed_at: batch.completed_at,
        }
    }
}

/// GET /batches/:id/progress - authoritative persisted state
async fn get_progress(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> ApiResult<Json<ProgressResponse>> {
    let batch = batches::get_batch(&state.db, batch_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batch {batch_id} not found")))?;
    Ok(Json(batch.into()))
}
