//! NER backend trait and the patterns-only placeholder.
//!
//! The `NerBackend` trait abstracts over token-classification models.
//! Implementations:
//! - `HttpNerClient`: hosted inference endpoint
//! - `OnnxNerModel`: local CPU model (requires the `onnx` feature)
//! - `NoopNer`: returns nothing, leaving detection to the pattern rules

use blackline_core::Result;
use serde::{Deserialize, Serialize};

/// One raw token-classification result, in the shape hosted inference
/// endpoints return with `aggregation_strategy = "simple"`.
///
/// Offsets, when present, are character offsets into the submitted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNerEntity {
    #[serde(alias = "entity")]
    pub entity_group: String,
    pub word: String,
    pub score: f64,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

/// Trait for NER backends.
pub trait NerBackend: Send + Sync {
    /// Short name used in logs and model statistics.
    fn name(&self) -> &str;

    /// Run the model over `text`. `language` is a lower-case language code.
    fn recognize(&self, text: &str, language: &str) -> Result<Vec<RawNerEntity>>;

    /// Whether the backend can produce results at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Placeholder backend that never finds anything (patterns-only mode).
pub struct NoopNer;

impl NerBackend for NoopNer {
    fn name(&self) -> &str {
        "none"
    }

    fn recognize(&self, _text: &str, _language: &str) -> Result<Vec<RawNerEntity>> {
        Ok(Vec::new())
    }

    fn is_available(&self) -> bool {
        false
    }
}
