//! Pipeline result types.

use blackline_core::{Entity, RedactionBox, RiskLevel};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Detector statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    /// Pattern candidates before reconciliation.
    pub pattern_matches: usize,
    /// Model candidates (at or above threshold) before reconciliation.
    pub model_matches: usize,
    /// Canonical entities after reconciliation.
    pub total_entities: usize,
    pub critical_entities: usize,
    pub high_entities: usize,
    pub medium_entities: usize,
    pub low_entities: usize,
    /// Backend that served the model tier.
    pub model_backend: String,
    pub used_fallback: bool,
}

impl ModelStats {
    pub(crate) fn count_risks(&mut self, entities: &[Entity]) {
        self.total_entities = entities.len();
        for e in entities {
            match e.risk_level {
                RiskLevel::Critical => self.critical_entities += 1,
                RiskLevel::High => self.high_entities += 1,
                RiskLevel::Medium => self.medium_entities += 1,
                RiskLevel::Low => self.low_entities += 1,
            }
        }
    }
}

/// Per-stage wall-clock times in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTimes {
    pub ocr: u64,
    pub detection: u64,
    pub redaction: u64,
    pub alignment: u64,
    pub compositing: u64,
    pub total: u64,
}

/// Result of redacting plain text.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextReport {
    pub original_text: String,
    pub redacted_text: String,
    pub entities: Vec<Entity>,
    pub model_stats: ModelStats,
    /// Detection plus redaction time in milliseconds.
    pub processing_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

/// Result of processing one scanned document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    pub document_id: String,
    /// SHA-256 of the uploaded image bytes.
    pub image_sha256: String,
    pub original_text: String,
    pub redacted_text: String,
    /// Canonical entity list; `entityRef` values index into it.
    pub entities: Vec<Entity>,
    /// Indices of the entities that were redacted.
    pub selected_entities: Vec<usize>,
    pub ocr_word_count: usize,
    pub redaction_boxes: Vec<RedactionBox>,
    /// Base64 PNG with the boxes painted, when compositing succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redacted_image: Option<String>,
    pub model_stats: ModelStats,
    pub alignment_misses: usize,
    pub processing_time: ProcessingTimes,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}
