//! Blackline Detect — pattern rules, NER model adapter, span reconciliation.
//!
//! `PatternDetector` and `ModelAdapter` each produce candidate entities;
//! `SpanReconciler` merges them into one non-overlapping list. When the
//! `onnx` feature is enabled and model files are present, `OnnxNerModel`
//! runs locally as the CPU fallback for the hosted endpoint.

pub mod http_ner;
pub mod model;
pub mod ner;
pub mod onnx_ner;
pub mod patterns;
pub mod reconcile;
pub mod span;

pub use http_ner::HttpNerClient;
pub use model::{ModelAdapter, ModelCategory, ModelDetection};
pub use ner::{NerBackend, NoopNer, RawNerEntity};
pub use patterns::PatternDetector;
pub use reconcile::SpanReconciler;

#[cfg(feature = "onnx")]
pub use onnx_ner::OnnxNerModel;

use std::path::Path;
use std::sync::Arc;

use blackline_core::{NerSettings, Result};

/// Primary backend plus optional fallback.
pub type NerTiers = (Arc<dyn NerBackend>, Option<Arc<dyn NerBackend>>);

/// Pick the available NER backends.
///
/// The hosted endpoint is primary when a token is configured. The local
/// ONNX model (if the feature is enabled and files are present) is its
/// fallback, or the primary when there is no token. A hosted primary with
/// no local model falls back to the same endpoint with the other model.
/// With neither, the `NoopNer` placeholder leaves detection to the
/// pattern rules. Backends that report themselves unavailable are skipped.
pub fn create_ner_backends(settings: &NerSettings, model_dir: &Path) -> NerTiers {
    let hosted = settings
        .api_token
        .as_ref()
        .and_then(|_| available(HttpNerClient::new(settings), "Hosted NER"));

    let local = load_local(model_dir);

    match (hosted, local) {
        (Some(hosted), Some(local)) => {
            tracing::info!("Using hosted NER (fallback: {})", local.name());
            (hosted, Some(local))
        }
        (Some(hosted), None) => {
            let alternate = available(HttpNerClient::alternate(settings), "Alternate hosted NER");
            tracing::info!(
                "Using hosted NER (fallback: {})",
                alternate.as_ref().map(|a| a.name()).unwrap_or("none")
            );
            (hosted, alternate)
        }
        (None, Some(local)) => {
            tracing::info!("Using local NER model only");
            (local, None)
        }
        (None, None) => {
            tracing::info!("No NER backend configured. Using pattern rules only.");
            (Arc::new(NoopNer), None)
        }
    }
}

fn available<B>(backend: Result<B>, what: &str) -> Option<Arc<dyn NerBackend>>
where
    B: NerBackend + 'static,
{
    match backend {
        Ok(backend) if backend.is_available() => Some(Arc::new(backend)),
        Ok(backend) => {
            tracing::warn!("{} ({}) reports itself unavailable", what, backend.name());
            None
        }
        Err(e) => {
            tracing::warn!("{} unavailable: {}", what, e);
            None
        }
    }
}

/// Convenience: build a `ModelAdapter` over `create_ner_backends`.
pub fn create_model_adapter(settings: &NerSettings, model_dir: &Path) -> ModelAdapter {
    let (primary, fallback) = create_ner_backends(settings, model_dir);
    ModelAdapter::new(primary, fallback)
}

fn load_local(model_dir: &Path) -> Option<Arc<dyn NerBackend>> {
    #[cfg(feature = "onnx")]
    {
        if let Some(model) = available(OnnxNerModel::load(model_dir), "Local NER model") {
            return Some(model);
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::debug!("ONNX feature disabled. No local NER model.");
    }

    None
}
