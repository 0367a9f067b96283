//! Scanned document route (multipart upload).

use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use blackline_core::{Error, Result, VisualPiiDetection};
use tracing::{debug, warn};

use super::{error_response, ApiResponse};
use crate::state::AppState;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pii/process-document", post(process_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Default)]
struct Upload {
    image: Option<Vec<u8>>,
    language: Option<String>,
    threshold: Option<f64>,
    selection: Option<Vec<usize>>,
    visual_pii: Vec<VisualPiiDetection>,
}

/// POST /api/pii/process-document — OCR, detect, redact and box one image.
async fn process_document(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> ApiResponse {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => return error_response(&e),
    };
    let Some(image) = upload.image else {
        return error_response(&Error::MalformedInput("missing `file` field".into()));
    };
    let options = match state.options(upload.threshold, upload.language.as_deref()) {
        Ok(options) => options,
        Err(e) => return error_response(&e),
    };

    let worker = state.clone();
    let visual_pii = upload.visual_pii;
    let selection = upload.selection;
    let result = tokio::task::spawn_blocking(move || {
        worker.pipeline.process_document(
            worker.ocr.as_ref(),
            &image,
            &visual_pii,
            selection.as_deref(),
            &options,
        )
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            state.record_document(&report);
            (StatusCode::OK, Json(serde_json::json!(report)))
        }
        Ok(Err(e)) => {
            state.record_failure();
            warn!("Document processing failed: {}", e);
            error_response(&e)
        }
        Err(e) => {
            state.record_failure();
            error_response(&Error::Internal(format!("document task failed: {}", e)))
        }
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::MalformedInput(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::MalformedInput(format!("unreadable file field: {}", e)))?;
                upload.image = Some(bytes.to_vec());
            }
            "language" => upload.language = Some(field_text(field).await?),
            "confidenceThreshold" => {
                let raw = field_text(field).await?;
                let threshold = raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::MalformedInput(format!("confidenceThreshold {:?} is not a number", raw)))?;
                upload.threshold = Some(threshold);
            }
            "selectedEntities" => {
                let raw = field_text(field).await?;
                if !raw.trim().is_empty() {
                    let selection = serde_json::from_str(&raw)
                        .map_err(|e| Error::MalformedInput(format!("selectedEntities: {}", e)))?;
                    upload.selection = Some(selection);
                }
            }
            "visualPii" => {
                let raw = field_text(field).await?;
                if !raw.trim().is_empty() {
                    upload.visual_pii = serde_json::from_str(&raw)
                        .map_err(|e| Error::MalformedInput(format!("visualPii: {}", e)))?;
                }
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(upload)
}

async fn field_text(field: Field<'_>) -> Result<String> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| Error::MalformedInput(format!("unreadable {} field: {}", name, e)))
}
