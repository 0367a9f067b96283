//! Plain-text PII routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use blackline_core::{Entity, Error};
use blackline_redact::TextRedactor;
use serde::Deserialize;
use tracing::warn;

use super::{error_response, ApiResponse};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pii/ner", post(detect_entities))
        .route("/pii/redact", post(redact_entities))
}

#[derive(Deserialize)]
struct NerRequest {
    text: String,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct RedactRequest {
    text: String,
    entities: Vec<Entity>,
}

/// POST /api/pii/ner — detect entities and return the redacted text.
async fn detect_entities(State(state): State<Arc<AppState>>, Json(req): Json<NerRequest>) -> ApiResponse {
    let options = match state.options(req.threshold, req.language.as_deref()) {
        Ok(options) => options,
        Err(e) => return error_response(&e),
    };

    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || worker.pipeline.redact_text(&req.text, &options)).await;

    match result {
        Ok(Ok(report)) => {
            state.record_text(&report);
            (StatusCode::OK, Json(serde_json::json!(report)))
        }
        Ok(Err(e)) => {
            warn!("Text detection failed: {}", e);
            error_response(&e)
        }
        Err(e) => error_response(&Error::Internal(format!("detection task failed: {}", e))),
    }
}

/// POST /api/pii/redact — apply caller-supplied entities to the text.
async fn redact_entities(Json(req): Json<RedactRequest>) -> ApiResponse {
    let redacted = TextRedactor::new().redact(&req.text, &req.entities);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "redactedText": redacted,
            "entityCount": req.entities.len(),
        })),
    )
}
