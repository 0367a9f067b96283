//! Error types for Blackline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// OCR or NER collaborator failed after every fallback was tried.
    #[error("Detection failure: {0}")]
    DetectionFailure(String),

    /// Input that cannot be processed (empty text, no OCR words).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("NER error: {0}")]
    Ner(String),

    #[error("Compositor error: {0}")]
    Compositor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
