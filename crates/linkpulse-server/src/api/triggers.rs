//! Firestore document-write trigger for the `clicks` collection.
//!
//! Any event that decodes answers 200, whatever enrichment made of it;
//! only payloads that are not a write event at all are rejected.

use axum::{body::Bytes, extract::State, Extension, Json};
use linkpulse_enrich::{EnrichmentWarning, ProcessOutcome};
use linkpulse_firestore::DocumentWriteEvent;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct TriggerResult {
    firestore_id: String,
    /// `"enriched"` or `"skipped_deletion"`.
    status: &'static str,
    written: bool,
    warnings: Vec<EnrichmentWarning>,
}

pub(super) async fn handle_click_write(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<TriggerResult>>, ApiError> {
    let event: DocumentWriteEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(request_id = %req_id.0, error = %e, "trigger payload is not a write event");
        ApiError::new(
            req_id.0.clone(),
            "bad_request",
            format!("invalid document write event: {e}"),
        )
    })?;

    let change = event.into_change().map_err(|e| {
        tracing::warn!(request_id = %req_id.0, error = %e, "trigger payload rejected");
        ApiError::new(req_id.0.clone(), "bad_request", e.to_string())
    })?;

    let data = match state.enricher.process_change(change).await {
        ProcessOutcome::SkippedDeletion { document_id } => TriggerResult {
            firestore_id: document_id,
            status: "skipped_deletion",
            written: false,
            warnings: Vec::new(),
        },
        ProcessOutcome::Enriched(outcome) => TriggerResult {
            firestore_id: outcome.record.firestore_id,
            status: "enriched",
            written: outcome.written,
            warnings: outcome.warnings,
        },
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
