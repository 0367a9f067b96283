//! Document redaction pipeline: detect, reconcile, redact, align, box.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use blackline_core::{Entity, Error, PipelineOptions, Result, VisualPiiDetection};
use blackline_detect::{ModelAdapter, PatternDetector, SpanReconciler};
use blackline_redact::{EntityAlignment, RedactionBoxBuilder, TextRedactor, VisualAligner};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::compositor::ImageCompositor;
use crate::ocr::OcrBackend;
use crate::types::{DocumentReport, ModelStats, ProcessingTimes, TextReport};

/// Canonical entities plus detector statistics.
struct Detection {
    entities: Vec<Entity>,
    stats: ModelStats,
}

/// One pipeline instance per service; holds no per-document state.
pub struct RedactionPipeline {
    patterns: PatternDetector,
    model: ModelAdapter,
    redactor: TextRedactor,
    aligner: VisualAligner,
    boxes: RedactionBoxBuilder,
    compositor: Option<Arc<dyn ImageCompositor>>,
}

impl RedactionPipeline {
    pub fn new(model: ModelAdapter) -> Self {
        Self {
            patterns: PatternDetector::new(),
            model,
            redactor: TextRedactor::new(),
            aligner: VisualAligner::new(),
            boxes: RedactionBoxBuilder::new(),
            compositor: None,
        }
    }

    pub fn with_compositor(mut self, compositor: Arc<dyn ImageCompositor>) -> Self {
        self.compositor = Some(compositor);
        self
    }

    pub fn model(&self) -> &ModelAdapter {
        &self.model
    }

    /// Detect and redact PII in plain text. Empty text yields an empty
    /// report without running the detectors.
    pub fn redact_text(&self, text: &str, options: &PipelineOptions) -> Result<TextReport> {
        if text.trim().is_empty() {
            return Ok(TextReport {
                original_text: text.to_string(),
                redacted_text: text.to_string(),
                skipped_reason: Some("empty text".into()),
                ..TextReport::default()
            });
        }

        let start = Instant::now();
        let detection = self.detect(text, options)?;
        let redacted_text = self.redactor.redact(text, &detection.entities);

        Ok(TextReport {
            original_text: text.to_string(),
            redacted_text,
            entities: detection.entities,
            model_stats: detection.stats,
            processing_time: start.elapsed().as_millis() as u64,
            skipped_reason: None,
        })
    }

    /// Full document run: OCR, detection, selection, text redaction,
    /// layout alignment, box building and optional compositing.
    ///
    /// `selection` holds indices into the canonical entity list; `None` or
    /// an empty slice selects every entity.
    pub fn process_document(
        &self,
        ocr: &dyn OcrBackend,
        image: &[u8],
        visual_pii: &[VisualPiiDetection],
        selection: Option<&[usize]>,
        options: &PipelineOptions,
    ) -> Result<DocumentReport> {
        let started = Instant::now();
        let mut times = ProcessingTimes::default();
        let mut report = empty_report(image);

        if image.is_empty() {
            report.skipped_reason = Some("empty image".into());
            return Ok(report);
        }

        let stage = Instant::now();
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let ocr_result = ocr
            .recognize(&encoded, std::slice::from_ref(&options.language))
            .map_err(|e| Error::DetectionFailure(format!("OCR ({}) failed: {}", ocr.name(), e)))?;
        times.ocr = elapsed_ms(stage);

        report.original_text = ocr_result.text.clone();
        report.redacted_text = ocr_result.text.clone();
        report.ocr_word_count = ocr_result.words.len();

        if ocr_result.text.trim().is_empty() || ocr_result.words.is_empty() {
            let reason = Error::MalformedInput(format!(
                "OCR returned {} chars and {} words",
                ocr_result.text.chars().count(),
                ocr_result.words.len()
            ));
            warn!("Skipping document {}: {}", report.document_id, reason);
            report.skipped_reason = Some(reason.to_string());
            times.total = elapsed_ms(started);
            report.processing_time = times;
            return Ok(report);
        }

        let stage = Instant::now();
        let detection = self.detect(&ocr_result.text, options)?;
        times.detection = elapsed_ms(stage);

        let selected = select(&detection.entities, selection);
        let chosen: Vec<Entity> = selected.iter().map(|&i| detection.entities[i].clone()).collect();

        let stage = Instant::now();
        report.redacted_text = self.redactor.redact(&ocr_result.text, &chosen);
        times.redaction = elapsed_ms(stage);

        let stage = Instant::now();
        let alignments: Vec<EntityAlignment> = selected
            .iter()
            .zip(&chosen)
            .map(|(&entity_ref, entity)| EntityAlignment {
                entity_ref,
                region: self.aligner.align(entity, &ocr_result.words),
            })
            .collect();
        let plan = self.boxes.build(&alignments, visual_pii);
        times.alignment = elapsed_ms(stage);

        let stage = Instant::now();
        report.redacted_image = match &self.compositor {
            Some(compositor) if !plan.boxes.is_empty() => match compositor.composite(image, &plan.boxes) {
                Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                Err(e) => {
                    warn!("Compositing failed for {}; redacted image omitted: {}", report.document_id, e);
                    None
                }
            },
            _ => None,
        };
        times.compositing = elapsed_ms(stage);
        times.total = elapsed_ms(started);

        info!(
            "Document {}: {} entities, {} selected, {} boxes, {} alignment misses in {}ms",
            report.document_id,
            detection.entities.len(),
            selected.len(),
            plan.boxes.len(),
            plan.alignment_misses,
            times.total
        );

        report.entities = detection.entities;
        report.selected_entities = selected;
        report.redaction_boxes = plan.boxes;
        report.alignment_misses = plan.alignment_misses;
        report.model_stats = detection.stats;
        report.processing_time = times;
        Ok(report)
    }

    /// Patterns and model run concurrently; the reconciler waits for both.
    fn detect(&self, text: &str, options: &PipelineOptions) -> Result<Detection> {
        let (pattern, model) = std::thread::scope(|scope| {
            let patterns = scope.spawn(|| self.patterns.detect(text));
            let model = self
                .model
                .detect(text, &options.language, options.confidence_threshold);
            (patterns.join(), model)
        });
        let pattern = pattern.map_err(|_| Error::Internal("pattern detector panicked".into()))?;
        let model = model?;

        let mut stats = ModelStats {
            pattern_matches: pattern.len(),
            model_matches: model.entities.len(),
            model_backend: model.backend,
            used_fallback: model.used_fallback,
            ..ModelStats::default()
        };

        let entities = SpanReconciler::new(options.confidence_threshold).reconcile(pattern, model.entities);
        stats.count_risks(&entities);
        debug!(
            "Detection: {} pattern + {} model → {} canonical",
            stats.pattern_matches, stats.model_matches, stats.total_entities
        );
        Ok(Detection { entities, stats })
    }
}

/// Explicit indices (deduplicated, in range) or every entity.
fn select(entities: &[Entity], selection: Option<&[usize]>) -> Vec<usize> {
    match selection {
        Some(indices) if !indices.is_empty() => {
            let mut chosen: Vec<usize> = indices.iter().copied().filter(|&i| i < entities.len()).collect();
            if chosen.len() < indices.len() {
                warn!(
                    "Ignoring {} selected indices outside 0..{}",
                    indices.len() - chosen.len(),
                    entities.len()
                );
            }
            chosen.sort_unstable();
            chosen.dedup();
            chosen
        }
        _ => (0..entities.len()).collect(),
    }
}

fn empty_report(image: &[u8]) -> DocumentReport {
    DocumentReport {
        document_id: uuid::Uuid::new_v4().to_string(),
        image_sha256: hex::encode(Sha256::digest(image)),
        original_text: String::new(),
        redacted_text: String::new(),
        entities: Vec::new(),
        selected_entities: Vec::new(),
        ocr_word_count: 0,
        redaction_boxes: Vec::new(),
        redacted_image: None,
        model_stats: ModelStats::default(),
        alignment_misses: 0,
        processing_time: ProcessingTimes::default(),
        processed_at: Utc::now(),
        skipped_reason: None,
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
