//! Response shape tests: field names the web client reads from the
//! document and text reports.

use blackline_core::{BoxKind, Entity, EntityLabel, RedactionBox, RedactionPolicy, RiskLevel};
use blackline_runtime::{DocumentReport, ModelStats, ProcessingTimes, TextReport};

fn ssn() -> Entity {
    Entity {
        text: "123-45-6789".into(),
        label: EntityLabel::Ssn,
        confidence: 0.95,
        start: 5,
        end: 16,
        risk_level: RiskLevel::Critical,
        redaction_policy: RedactionPolicy::Full,
        context: Some("SSN: 123-45-6789".into()),
    }
}

fn document() -> DocumentReport {
    DocumentReport {
        document_id: "7d1c6a1e-0000-4000-8000-000000000000".into(),
        image_sha256: "ab".repeat(32),
        original_text: "SSN: 123-45-6789".into(),
        redacted_text: "SSN: ███████████".into(),
        entities: vec![ssn()],
        selected_entities: vec![0],
        ocr_word_count: 2,
        redaction_boxes: vec![
            RedactionBox {
                x: 60.0,
                y: 40.0,
                width: 45.0,
                height: 14.0,
                kind: BoxKind::Text,
                entity_ref: Some(0),
                visual_pii_ref: None,
            },
            RedactionBox {
                x: 350.0,
                y: 450.0,
                width: 150.0,
                height: 50.0,
                kind: BoxKind::Visual,
                entity_ref: None,
                visual_pii_ref: Some(0),
            },
        ],
        redacted_image: None,
        model_stats: ModelStats {
            pattern_matches: 1,
            total_entities: 1,
            critical_entities: 1,
            model_backend: "none".into(),
            ..ModelStats::default()
        },
        alignment_misses: 0,
        processing_time: ProcessingTimes::default(),
        processed_at: chrono::Utc::now(),
        skipped_reason: None,
    }
}

/// Document report: camelCase keys, optional fields omitted when empty.
#[test]
fn test_document_report_shape() {
    let json = serde_json::to_value(document()).unwrap();

    for key in [
        "documentId",
        "imageSha256",
        "originalText",
        "redactedText",
        "entities",
        "selectedEntities",
        "ocrWordCount",
        "redactionBoxes",
        "modelStats",
        "alignmentMisses",
        "processingTime",
        "processedAt",
    ] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert!(json.get("redactedImage").is_none());
    assert!(json.get("skippedReason").is_none());
    assert!(json["processedAt"].is_string());
    assert!(json["processingTime"]["total"].is_number());
}

/// Entities carry screaming-case enums and character offsets.
#[test]
fn test_entity_shape() {
    let json = serde_json::to_value(document()).unwrap();
    let entity = &json["entities"][0];

    assert_eq!(entity["label"], "SSN");
    assert_eq!(entity["riskLevel"], "CRITICAL");
    assert_eq!(entity["redactionPolicy"], "FULL");
    assert_eq!(entity["start"], 5);
    assert_eq!(entity["end"], 16);
    assert!(entity["context"].is_string());
}

/// Text boxes reference an entity; visual boxes reference a detection.
#[test]
fn test_redaction_box_shape() {
    let json = serde_json::to_value(document()).unwrap();
    let boxes = json["redactionBoxes"].as_array().unwrap();

    assert_eq!(boxes[0]["type"], "text");
    assert_eq!(boxes[0]["entityRef"], 0);
    assert!(boxes[0].get("visualPIIRef").is_none());

    assert_eq!(boxes[1]["type"], "visual");
    assert_eq!(boxes[1]["visualPIIRef"], 0);
    assert!(boxes[1].get("entityRef").is_none());
}

#[test]
fn test_model_stats_shape() {
    let json = serde_json::to_value(document()).unwrap();
    let stats = &json["modelStats"];

    assert_eq!(stats["patternMatches"], 1);
    assert_eq!(stats["modelMatches"], 0);
    assert_eq!(stats["criticalEntities"], 1);
    assert_eq!(stats["modelBackend"], "none");
    assert_eq!(stats["usedFallback"], false);
}

/// Skipped text report keeps the reason and echoes the input.
#[test]
fn test_skipped_text_report_shape() {
    let report = TextReport {
        original_text: " ".into(),
        redacted_text: " ".into(),
        skipped_reason: Some("empty text".into()),
        ..TextReport::default()
    };
    let json = serde_json::to_value(report).unwrap();

    assert_eq!(json["skippedReason"], "empty text");
    assert_eq!(json["entities"], serde_json::json!([]));
    assert_eq!(json["processingTime"], 0);
}
