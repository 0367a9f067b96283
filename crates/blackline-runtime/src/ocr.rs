//! OCR collaborator: trait plus the Google Vision `images:annotate` client.

use std::time::Duration;

use blackline_core::{BoundingBox, Error, OcrSettings, OcrWord, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

/// Languages hinted to the OCR engine when the caller gives none.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "hi", "bn", "ta", "te", "mr", "gu", "kn", "ml", "pa", "ur"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Recognized text plus the word layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub text: String,
    #[serde(rename = "boundingBoxes")]
    pub words: Vec<OcrWord>,
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Recognize a base64-encoded image. Empty `language_hints` lets the
    /// backend pick its own.
    fn recognize(&self, image_base64: &str, language_hints: &[String]) -> Result<OcrResult>;
}

/// Blocking Google Vision client.
pub struct VisionOcrClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    word_confidence_threshold: f64,
}

impl VisionOcrClient {
    pub fn new(settings: &OcrSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build OCR client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            word_confidence_threshold: settings.word_confidence_threshold,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl OcrBackend for VisionOcrClient {
    fn name(&self) -> &str {
        "google-vision"
    }

    fn recognize(&self, image_base64: &str, language_hints: &[String]) -> Result<OcrResult> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Ocr("Vision API key not configured".into()))?;

        let hints: Vec<String> = if language_hints.is_empty() {
            SUPPORTED_LANGUAGES.iter().map(|l| l.to_string()).collect()
        } else {
            language_hints.to_vec()
        };

        let body = json!({
            "requests": [{
                "image": { "content": image_base64 },
                "features": [
                    { "type": "DOCUMENT_TEXT_DETECTION" },
                    { "type": "TEXT_DETECTION" }
                ],
                "imageContext": {
                    "languageHints": hints,
                    "textDetectionParams": { "enableTextDetectionConfidenceScore": true }
                }
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .map_err(|e| Error::Ocr(format!("Vision request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::Ocr(format!("Vision returned {}: {}", status, detail)));
        }

        let parsed: AnnotateResponse = response
            .json()
            .map_err(|e| Error::Ocr(format!("Unreadable Vision response: {}", e)))?;
        let result = parse_annotation(parsed, self.word_confidence_threshold)?;
        info!(
            "OCR: {} chars, {} words",
            result.text.chars().count(),
            result.words.len()
        );
        Ok(result)
    }
}

// Vision wire types (only the fields used).

#[derive(Debug, Default, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAnnotation {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Default, Deserialize)]
struct Page {
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Debug, Default, Deserialize)]
struct Block {
    #[serde(default)]
    paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Default, Deserialize)]
struct Paragraph {
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Word {
    bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    symbols: Vec<Symbol>,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Symbol {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextAnnotation {
    #[serde(default)]
    description: String,
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Default, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

#[derive(Debug, Default, Deserialize)]
struct Vertex {
    x: Option<f64>,
    y: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

impl BoundingPoly {
    /// Axis-aligned box over the vertices; missing coordinates count as 0.
    fn to_box(&self) -> Option<BoundingBox> {
        if self.vertices.is_empty() {
            return None;
        }
        let xs = self.vertices.iter().map(|v| v.x.unwrap_or(0.0));
        let ys = self.vertices.iter().map(|v| v.y.unwrap_or(0.0));
        let (x1, x2) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
        let (y1, y2) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some(BoundingBox::from_corners(x1, y1, x2, y2))
    }
}

impl Word {
    fn text(&self) -> String {
        self.symbols.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Turn one annotate response into text plus word layout.
pub fn parse_annotation(response: AnnotateResponse, word_threshold: f64) -> Result<OcrResult> {
    let Some(annotation) = response.responses.into_iter().next() else {
        return Ok(OcrResult::default());
    };
    if let Some(status) = &annotation.error {
        return Err(Error::Ocr(format!("Vision error: {}", status.message)));
    }

    let pages: &[Page] = annotation
        .full_text_annotation
        .as_ref()
        .map(|f| f.pages.as_slice())
        .unwrap_or(&[]);
    let paragraphs = || {
        pages
            .iter()
            .flat_map(|p| &p.blocks)
            .flat_map(|b| &b.paragraphs)
    };

    // Text: full annotation, else confident page words, else first text annotation.
    let mut text = annotation
        .full_text_annotation
        .as_ref()
        .map(|f| f.text.clone())
        .unwrap_or_default();
    if text.trim().is_empty() {
        text = paragraphs()
            .map(|para| {
                para.words
                    .iter()
                    .filter(|w| w.confidence >= word_threshold)
                    .map(Word::text)
                    .filter(|t| !t.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");
    }
    if text.trim().is_empty() {
        if let Some(first) = annotation.text_annotations.first() {
            text = first.description.clone();
        }
    }

    // Layout: confident page words with geometry, else per-word text annotations.
    let mut words: Vec<OcrWord> = paragraphs()
        .flat_map(|para| &para.words)
        .filter(|w| w.confidence >= word_threshold)
        .filter_map(|w| {
            let bounding_box = w.bounding_box.as_ref()?.to_box()?;
            Some(OcrWord {
                text: w.text(),
                confidence: w.confidence,
                bounding_box,
            })
        })
        .collect();
    if words.is_empty() {
        words = annotation
            .text_annotations
            .iter()
            .skip(1)
            .filter(|a| !a.description.is_empty())
            .filter_map(|a| {
                Some(OcrWord {
                    text: a.description.clone(),
                    confidence: 1.0,
                    bounding_box: a.bounding_poly.as_ref()?.to_box()?,
                })
            })
            .collect();
    }

    debug!("Parsed Vision response: {} words", words.len());
    Ok(OcrResult {
        text: collapse_whitespace(&text),
        words,
    })
}

/// Collapse runs of spaces within each line and drop blank lines.
pub fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
