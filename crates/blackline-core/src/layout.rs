//! Page layout: OCR words, visual PII detections, redaction boxes.

use serde::{Deserialize, Serialize};

use crate::entity::RiskLevel;

/// Axis-aligned rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build from `[x1, y1, x2, y2]` corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::from_corners(left, top, right, bottom)
    }
}

/// A single recognized word as reported by the OCR collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrWord {
    pub text: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// Kind of visual element flagged by an external detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualPiiKind {
    Signature,
    HandwrittenText,
    Stamp,
    Logo,
    Barcode,
}

/// Visual PII detection supplied by an external detector (signature, stamp, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualPiiDetection {
    #[serde(rename = "type")]
    pub kind: VisualPiiKind,
    /// `[x1, y1, x2, y2]`.
    pub bbox: [f64; 4],
    pub confidence: f64,
    pub risk_level: RiskLevel,
}

impl VisualPiiDetection {
    pub fn bounding_box(&self) -> BoundingBox {
        let [x1, y1, x2, y2] = self.bbox;
        BoundingBox::from_corners(x1, y1, x2, y2)
    }
}

/// Provenance of a redaction box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxKind {
    Text,
    Visual,
}

/// Opaque rectangle handed to the image compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "type")]
    pub kind: BoxKind,
    /// Index into the canonical entity list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_ref: Option<usize>,
    /// Index into the supplied visual PII detections.
    #[serde(
        default,
        rename = "visualPIIRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub visual_pii_ref: Option<usize>,
}

impl RedactionBox {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_covers_both() {
        let a = BoundingBox::new(10.0, 20.0, 30.0, 10.0);
        let b = BoundingBox::new(50.0, 18.0, 20.0, 14.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(10.0, 18.0, 60.0, 14.0));
        assert_eq!(u, b.union(&a));
    }

    #[test]
    fn test_visual_bbox_corners() {
        let v = VisualPiiDetection {
            kind: VisualPiiKind::Signature,
            bbox: [350.0, 450.0, 500.0, 500.0],
            confidence: 0.85,
            risk_level: RiskLevel::High,
        };
        assert_eq!(v.bounding_box(), BoundingBox::new(350.0, 450.0, 150.0, 50.0));
    }

    #[test]
    fn test_ocr_word_wire_shape() {
        let json = serde_json::json!({
            "text": "John",
            "confidence": 0.98,
            "boundingBox": { "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0 }
        });
        let word: OcrWord = serde_json::from_value(json).unwrap();
        assert_eq!(word.bounding_box.height, 4.0);
    }

    #[test]
    fn test_redaction_box_wire_shape() {
        let b = RedactionBox {
            x: 0.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
            kind: BoxKind::Visual,
            entity_ref: None,
            visual_pii_ref: Some(2),
        };
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["type"], "visual");
        assert_eq!(json["visualPIIRef"], 2);
        assert!(json.get("entityRef").is_none());
    }
}
