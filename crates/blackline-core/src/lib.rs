//! Blackline Core — entity and layout data model, errors, configuration.

pub mod config;
pub mod entity;
pub mod error;
pub mod layout;

pub use config::{BlacklineConfig, NerSettings, OcrSettings, PipelineOptions, ServiceConfig, CONFIG_FILE};
pub use entity::{Entity, EntityLabel, RedactionPolicy, RiskLevel};
pub use error::{Error, Result};
pub use layout::{BoundingBox, BoxKind, OcrWord, RedactionBox, VisualPiiDetection, VisualPiiKind};
