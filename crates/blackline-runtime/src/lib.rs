//! Blackline Runtime — OCR collaborator, image compositor, and the
//! document pipeline that ties detection, redaction and layout together.

pub mod compositor;
pub mod ocr;
pub mod pipeline;
pub mod types;

pub use compositor::{ImageCompositor, RasterCompositor};
pub use ocr::{OcrBackend, OcrResult, VisionOcrClient};
pub use pipeline::RedactionPipeline;
pub use types::{DocumentReport, ModelStats, ProcessingTimes, TextReport};
