//! Shared application state.

use std::sync::Arc;

use blackline_core::{BlacklineConfig, PipelineOptions, Result};
use blackline_runtime::{DocumentReport, OcrBackend, RedactionPipeline, TextReport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Running totals reported by `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub documents_processed: u64,
    pub documents_failed: u64,
    pub documents_skipped: u64,
    pub text_requests: u64,
    pub entities_detected: u64,
    pub alignment_misses: u64,
    pub started_at: DateTime<Utc>,
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self {
            documents_processed: 0,
            documents_failed: 0,
            documents_skipped: 0,
            text_requests: 0,
            entities_detected: 0,
            alignment_misses: 0,
            started_at: Utc::now(),
        }
    }
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: BlacklineConfig,
    pub pipeline: RedactionPipeline,
    pub ocr: Arc<dyn OcrBackend>,
    pub stats: RwLock<ServiceStats>,
}

impl AppState {
    pub fn new(config: BlacklineConfig, pipeline: RedactionPipeline, ocr: Arc<dyn OcrBackend>) -> Self {
        Self {
            config,
            pipeline,
            ocr,
            stats: RwLock::new(ServiceStats::default()),
        }
    }

    /// Per-request options, defaulting to the service configuration.
    pub fn options(&self, threshold: Option<f64>, language: Option<&str>) -> Result<PipelineOptions> {
        let service = &self.config.service;
        PipelineOptions::new(
            threshold.unwrap_or(service.confidence_threshold),
            language.unwrap_or(&service.language),
        )
    }

    pub fn record_text(&self, report: &TextReport) {
        let mut stats = self.stats.write();
        stats.text_requests += 1;
        stats.entities_detected += report.entities.len() as u64;
    }

    pub fn record_document(&self, report: &DocumentReport) {
        let mut stats = self.stats.write();
        if report.skipped_reason.is_some() {
            stats.documents_skipped += 1;
        } else {
            stats.documents_processed += 1;
        }
        stats.entities_detected += report.entities.len() as u64;
        stats.alignment_misses += report.alignment_misses as u64;
    }

    pub fn record_failure(&self) {
        self.stats.write().documents_failed += 1;
    }
}
