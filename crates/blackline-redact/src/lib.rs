//! Blackline Redact — text redaction, OCR layout alignment, box assembly.

pub mod align;
pub mod boxes;
pub mod text;

pub use align::{AlignStrategy, AlignedRegion, VisualAligner};
pub use boxes::{BoxPlan, EntityAlignment, RedactionBoxBuilder};
pub use text::TextRedactor;
