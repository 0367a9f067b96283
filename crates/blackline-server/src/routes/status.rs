//! Service status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

/// GET /api/status — document counters and active collaborators.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.stats.read().clone();
    let model = state.pipeline.model();

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": {
            "processed": stats.documents_processed,
            "failed": stats.documents_failed,
            "skipped": stats.documents_skipped,
        },
        "textRequests": stats.text_requests,
        "entitiesDetected": stats.entities_detected,
        "alignmentMisses": stats.alignment_misses,
        "ner": {
            "primary": model.primary_name(),
            "fallback": model.fallback_name(),
        },
        "ocr": state.ocr.name(),
        "defaults": state.config.service.pipeline_options(),
        "startedAt": stats.started_at,
    }))
}
