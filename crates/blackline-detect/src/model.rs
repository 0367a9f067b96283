//! Normalizes raw NER output into candidate entities, with model-tier
//! fallback.

use std::sync::Arc;

use blackline_core::{Entity, EntityLabel, Error, RedactionPolicy, Result, RiskLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::ner::{NerBackend, RawNerEntity};
use crate::span::{CharIndex, CONTEXT_RADIUS};

/// Coarse category of a model entity group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCategory {
    Person,
    Organization,
    Location,
    Misc,
    Other,
}

impl ModelCategory {
    /// Categorize an entity group such as `PER`, `B-ORG` or `GPE`.
    pub fn from_group(group: &str) -> Self {
        let group = group.to_uppercase();
        if group.contains("PER") {
            Self::Person
        } else if group.contains("ORG") {
            Self::Organization
        } else if group.contains("LOC") || group.contains("GPE") {
            Self::Location
        } else if group.contains("MISC") {
            Self::Misc
        } else {
            Self::Other
        }
    }
}

static MISC_SSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{3}-?\d{2}-?\d{4}").expect("valid regex"));
static MISC_CARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}").expect("valid regex"));
static MISC_ROUTING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{9}\b").expect("valid regex"));
static MISC_ACCOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{8,17}\b").expect("valid regex"));
static MISC_MONEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d+|\d+\.\d{2}").expect("valid regex"));
static MISC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}\b").expect("valid regex"));

/// Label, risk and policy for a model entity.
pub fn classify(category: ModelCategory, text: &str) -> (EntityLabel, RiskLevel, RedactionPolicy) {
    use RedactionPolicy::*;
    use RiskLevel::*;

    match category {
        ModelCategory::Person => (EntityLabel::Person, High, Partial),
        ModelCategory::Organization => (EntityLabel::Organization, Medium, Partial),
        ModelCategory::Location => (EntityLabel::Location, Medium, Partial),
        ModelCategory::Misc => {
            if text.contains('@') {
                (EntityLabel::Email, High, Hash)
            } else if MISC_SSN.is_match(text) {
                (EntityLabel::Ssn, Critical, Full)
            } else if MISC_CARD.is_match(text) {
                (EntityLabel::CreditCard, Critical, Full)
            } else if MISC_ROUTING.is_match(text) {
                (EntityLabel::RoutingNumber, Critical, Full)
            } else if MISC_ACCOUNT.is_match(text) {
                (EntityLabel::BankAccount, Critical, Full)
            } else if MISC_MONEY.is_match(text) {
                (EntityLabel::MonetaryAmount, Medium, Partial)
            } else if MISC_DATE.is_match(text) {
                (EntityLabel::Date, Low, Partial)
            } else {
                (EntityLabel::Organization, Medium, Partial)
            }
        }
        ModelCategory::Other => (EntityLabel::Misc, Medium, Partial),
    }
}

/// Entities produced by one model run, tagged with the backend that served it.
#[derive(Debug, Clone)]
pub struct ModelDetection {
    pub entities: Vec<Entity>,
    pub backend: String,
    /// Whether the fallback tier produced the result.
    pub used_fallback: bool,
}

/// Runs the primary NER backend, falling back to the secondary on failure.
pub struct ModelAdapter {
    primary: Arc<dyn NerBackend>,
    fallback: Option<Arc<dyn NerBackend>>,
}

impl ModelAdapter {
    pub fn new(primary: Arc<dyn NerBackend>, fallback: Option<Arc<dyn NerBackend>>) -> Self {
        Self { primary, fallback }
    }

    /// Name of the primary backend.
    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&str> {
        self.fallback.as_deref().map(|f| f.name())
    }

    /// Run the model over `text` and keep entities scoring at or above
    /// `threshold`. Fails with `DetectionFailure` only when every tier failed.
    pub fn detect(&self, text: &str, language: &str, threshold: f64) -> Result<ModelDetection> {
        let (raw, backend, used_fallback) = match self.primary.recognize(text, language) {
            Ok(raw) => (raw, self.primary.name().to_string(), false),
            Err(primary_err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(Error::DetectionFailure(format!(
                        "NER model {} failed: {}",
                        self.primary.name(),
                        primary_err
                    )));
                };
                warn!(
                    "NER model {} failed ({}), falling back to {}",
                    self.primary.name(),
                    primary_err,
                    fallback.name()
                );
                match fallback.recognize(text, language) {
                    Ok(raw) => (raw, fallback.name().to_string(), true),
                    Err(fallback_err) => {
                        return Err(Error::DetectionFailure(format!(
                            "NER model {} failed: {}; fallback {} failed: {}",
                            self.primary.name(),
                            primary_err,
                            fallback.name(),
                            fallback_err
                        )));
                    }
                }
            }
        };

        let entities = normalize(&raw, text, threshold);
        info!(
            "Model detector ({}): {} raw, {} kept at threshold {}",
            backend,
            raw.len(),
            entities.len(),
            threshold
        );
        Ok(ModelDetection {
            entities,
            backend,
            used_fallback,
        })
    }
}

/// Convert raw model tuples into entities over `text`.
///
/// Entities below `threshold` are dropped, as are entities whose offsets
/// fall outside the text and whose word cannot be located in it.
pub fn normalize(raw: &[RawNerEntity], text: &str, threshold: f64) -> Vec<Entity> {
    let index = CharIndex::new(text);
    let len = index.char_len();

    raw.iter()
        .filter(|r| r.score >= threshold)
        .filter_map(|r| {
            let word = r.word.trim_start_matches("##").trim();
            let (start, end) = match (r.start, r.end) {
                (Some(s), Some(e)) if s < e && e <= len => (s, e),
                _ => match locate(text, &index, word) {
                    Some(span) => span,
                    None => {
                        warn!("Dropping {} entity with unusable offsets", r.entity_group);
                        return None;
                    }
                },
            };

            let entity_text = index.slice(start, end).to_string();
            let (label, risk_level, redaction_policy) =
                classify(ModelCategory::from_group(&r.entity_group), &entity_text);
            debug!("Model entity {:?} '{}' ({:.3})", label, entity_text, r.score);

            Some(Entity {
                text: entity_text,
                label,
                confidence: r.score.clamp(0.0, 1.0),
                start,
                end,
                risk_level,
                redaction_policy,
                context: Some(index.context(start, end, CONTEXT_RADIUS)),
            })
        })
        .collect()
}

/// First occurrence of `word` in `text`, as character offsets.
fn locate(text: &str, index: &CharIndex<'_>, word: &str) -> Option<(usize, usize)> {
    if word.is_empty() {
        return None;
    }
    let byte = text.find(word)?;
    Some((index.char_offset(byte), index.char_offset(byte + word.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FakeNer {
        name: &'static str,
        result: std::result::Result<Vec<RawNerEntity>, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeNer {
        fn ok(name: &'static str, raw: Vec<RawNerEntity>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Ok(raw),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str, reason: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err(reason.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl NerBackend for FakeNer {
        fn name(&self) -> &str {
            self.name
        }

        fn recognize(&self, _text: &str, language: &str) -> Result<Vec<RawNerEntity>> {
            self.calls.lock().push(language.to_string());
            self.result.clone().map_err(Error::Ner)
        }
    }

    fn raw(group: &str, word: &str, score: f64, start: usize, end: usize) -> RawNerEntity {
        RawNerEntity {
            entity_group: group.into(),
            word: word.into(),
            score,
            start: Some(start),
            end: Some(end),
        }
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(ModelCategory::from_group("PER"), ModelCategory::Person);
        assert_eq!(ModelCategory::from_group("b-person"), ModelCategory::Person);
        assert_eq!(ModelCategory::from_group("ORG"), ModelCategory::Organization);
        assert_eq!(ModelCategory::from_group("GPE"), ModelCategory::Location);
        assert_eq!(ModelCategory::from_group("MISC"), ModelCategory::Misc);
        assert_eq!(ModelCategory::from_group("DATE"), ModelCategory::Other);
    }

    #[test]
    fn test_misc_sniffing_priority() {
        let misc = |t| classify(ModelCategory::Misc, t).0;
        assert_eq!(misc("a@b.co"), EntityLabel::Email);
        assert_eq!(misc("123-45-6789"), EntityLabel::Ssn);
        assert_eq!(misc("4111 1111 1111 1111"), EntityLabel::CreditCard);
        assert_eq!(misc("$450"), EntityLabel::MonetaryAmount);
        assert_eq!(misc("12.50"), EntityLabel::MonetaryAmount);
        assert_eq!(misc("3/14/2024"), EntityLabel::Date);
        assert_eq!(misc("Eurozone"), EntityLabel::Organization);

        let (_, risk, policy) = classify(ModelCategory::Misc, "3/14/2024");
        assert_eq!((risk, policy), (RiskLevel::Low, RedactionPolicy::Partial));
    }

    #[test]
    fn test_person_mapping() {
        let (label, risk, policy) = classify(ModelCategory::Person, "John");
        assert_eq!(label, EntityLabel::Person);
        assert_eq!(risk, RiskLevel::High);
        assert_eq!(policy, RedactionPolicy::Partial);
    }

    #[test]
    fn test_threshold_filter() {
        let text = "John Smith met Acme";
        let raw = vec![raw("PER", "John Smith", 0.92, 0, 10), raw("ORG", "Acme", 0.4, 15, 19)];
        let entities = normalize(&raw, text, 0.7);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "John Smith");
        assert_eq!(normalize(&raw, text, 0.4).len(), 2);
    }

    #[test]
    fn test_subword_marker_and_missing_offsets() {
        let text = "Invoice for Kowalski";
        let raw = vec![RawNerEntity {
            entity_group: "PER".into(),
            word: "##Kowalski".into(),
            score: 0.88,
            start: None,
            end: None,
        }];
        let entities = normalize(&raw, text, 0.5);
        assert_eq!(entities.len(), 1);
        assert_eq!((entities[0].start, entities[0].end), (12, 20));
        assert_eq!(entities[0].text, "Kowalski");
    }

    #[test]
    fn test_out_of_range_offsets_dropped() {
        let raw = vec![raw("PER", "Ghost", 0.9, 40, 45)];
        assert!(normalize(&raw, "short text", 0.5).is_empty());
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let primary = FakeNer::ok("hosted", vec![raw("PER", "Ana", 0.9, 0, 3)]);
        let fallback = FakeNer::ok("onnx", vec![]);
        let adapter = ModelAdapter::new(primary.clone(), Some(fallback.clone()));
        let result = adapter.detect("Ana lives here", "en", 0.7).unwrap();
        assert_eq!(result.backend, "hosted");
        assert!(!result.used_fallback);
        assert_eq!(result.entities.len(), 1);
        assert!(fallback.calls.lock().is_empty());
    }

    #[test]
    fn test_fallback_on_primary_failure() {
        let primary = FakeNer::failing("hosted", "503 Service Unavailable");
        let fallback = FakeNer::ok("onnx", vec![raw("LOC", "Pune", 0.81, 10, 14)]);
        let adapter = ModelAdapter::new(primary, Some(fallback.clone()));
        let result = adapter.detect("Office in Pune", "hi", 0.7).unwrap();
        assert!(result.used_fallback);
        assert_eq!(result.backend, "onnx");
        assert_eq!(result.entities[0].label, EntityLabel::Location);
        assert_eq!(fallback.calls.lock().as_slice(), ["hi"]);
    }

    #[test]
    fn test_both_tiers_fail() {
        let adapter = ModelAdapter::new(
            FakeNer::failing("hosted", "timeout"),
            Some(FakeNer::failing("onnx", "model missing")),
        );
        let err = adapter.detect("text", "en", 0.7).unwrap_err();
        assert!(matches!(err, Error::DetectionFailure(_)));
        let msg = err.to_string();
        assert!(msg.contains("timeout") && msg.contains("model missing"));
    }

    #[test]
    fn test_no_fallback_configured() {
        let adapter = ModelAdapter::new(FakeNer::failing("hosted", "down"), None);
        assert!(matches!(
            adapter.detect("text", "en", 0.7),
            Err(Error::DetectionFailure(_))
        ));
    }
}
