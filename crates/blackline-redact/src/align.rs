//! Projects entities onto the OCR word layout.
//!
//! Alignment is a cascade: name pairing for person-name labels, then
//! token-overlap spans, then a fuzzy word match as the last resort.

use blackline_core::{BoundingBox, Entity, OcrWord};
use serde::Serialize;
use tracing::debug;

/// Minimum similarity for a fuzzy word match.
pub const FUZZY_THRESHOLD: f64 = 0.6;

/// Maximum number of fuzzy matches unioned into one region.
pub const FUZZY_TOP_K: usize = 3;

/// Which cascade step produced a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignStrategy {
    NamePair,
    TokenOverlap,
    Fuzzy,
}

/// Region of the page covering an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedRegion {
    /// OCR text covered by the region, words joined with spaces.
    pub text: String,
    /// Lowest confidence among the covered words.
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub strategy: AlignStrategy,
}

impl AlignedRegion {
    fn from_word(word: &OcrWord, strategy: AlignStrategy) -> Self {
        Self {
            text: word.text.clone(),
            confidence: word.confidence,
            bounding_box: word.bounding_box,
            strategy,
        }
    }

    fn extend(&mut self, word: &OcrWord) {
        self.text.push(' ');
        self.text.push_str(&word.text);
        self.confidence = self.confidence.min(word.confidence);
        self.bounding_box = self.bounding_box.union(&word.bounding_box);
    }
}

/// Stateless entity-to-layout aligner.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualAligner;

impl VisualAligner {
    pub fn new() -> Self {
        Self
    }

    /// Union rectangle covering `entity` on the page, if any.
    pub fn align(&self, entity: &Entity, words: &[OcrWord]) -> Option<AlignedRegion> {
        let entity_tokens = tokens(&entity.text);
        if entity_tokens.is_empty() {
            return None;
        }

        let region = (if entity.label.is_person_name() {
            name_pair(entity, words)
        } else {
            None
        })
        .or_else(|| token_overlap(&entity_tokens, words))
        .or_else(|| fuzzy(entity, words));

        match &region {
            Some(r) => debug!("Aligned {:?} via {:?} over '{}'", entity.label, r.strategy, r.text),
            None => debug!("No layout match for {:?} at {}..{}", entity.label, entity.start, entity.end),
        }
        region
    }
}

/// Strip non-alphanumerics and lowercase.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Consecutive word pair whose joined text equals, contains, or is
/// contained by the entity text.
fn name_pair(entity: &Entity, words: &[OcrWord]) -> Option<AlignedRegion> {
    let target = entity.text.to_lowercase();
    words.windows(2).find_map(|pair| {
        let joined = format!("{} {}", pair[0].text, pair[1].text).to_lowercase();
        if joined == target || joined.contains(&target) || target.contains(&joined) {
            let mut region = AlignedRegion::from_word(&pair[0], AlignStrategy::NamePair);
            region.extend(&pair[1]);
            Some(region)
        } else {
            None
        }
    })
}

/// 2 for an exact token, 1 for a substring either way, 0.5 for any shared
/// token, else 0.
fn word_score(entity_tokens: &[String], word: &OcrWord) -> f64 {
    let word_tokens = tokens(&word.text);
    if word_tokens.is_empty() {
        return 0.0;
    }
    let exact = entity_tokens.iter().any(|et| word_tokens.iter().any(|wt| et == wt));
    let partial = entity_tokens
        .iter()
        .any(|et| word_tokens.iter().any(|wt| et.contains(wt.as_str()) || wt.contains(et.as_str())));
    let shared = word_tokens.iter().any(|wt| entity_tokens.contains(wt));

    if exact {
        2.0
    } else if partial {
        1.0
    } else if shared {
        0.5
    } else {
        0.0
    }
}

/// Maximal runs of scoring words become spans; the longest span text wins,
/// first on ties.
fn token_overlap(entity_tokens: &[String], words: &[OcrWord]) -> Option<AlignedRegion> {
    let mut spans: Vec<AlignedRegion> = Vec::new();
    let mut in_run = false;

    for word in words {
        if word_score(entity_tokens, word) <= 0.0 {
            in_run = false;
            continue;
        }
        match spans.last_mut() {
            Some(current) if in_run => current.extend(word),
            _ => spans.push(AlignedRegion::from_word(word, AlignStrategy::TokenOverlap)),
        }
        in_run = true;
    }

    spans.into_iter().fold(None, |best: Option<AlignedRegion>, span| match best {
        Some(b) if b.text.chars().count() >= span.text.chars().count() => Some(b),
        _ => Some(span),
    })
}

/// Union of the (up to three) most similar words at or above the threshold.
fn fuzzy(entity: &Entity, words: &[OcrWord]) -> Option<AlignedRegion> {
    let target = entity.text.to_lowercase();
    let mut scored: Vec<(f64, &OcrWord)> = words
        .iter()
        .map(|w| (similarity(&target, &w.text.to_lowercase()), w))
        .filter(|(sim, _)| *sim >= FUZZY_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut iter = scored.into_iter().take(FUZZY_TOP_K);
    let (_, first) = iter.next()?;
    let mut region = AlignedRegion::from_word(first, AlignStrategy::Fuzzy);
    for (_, word) in iter {
        region.extend(word);
    }
    Some(region)
}

/// `1 - lev(a, b) / max(len)` over characters; two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Character-level edit distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackline_core::{EntityLabel, RedactionPolicy, RiskLevel};

    fn word(text: &str, x: f64) -> OcrWord {
        OcrWord {
            text: text.into(),
            confidence: 0.9,
            bounding_box: BoundingBox::new(x, 100.0, 40.0, 12.0),
        }
    }

    fn entity(text: &str, label: EntityLabel) -> Entity {
        Entity {
            text: text.into(),
            label,
            confidence: 0.95,
            start: 0,
            end: text.chars().count(),
            risk_level: RiskLevel::High,
            redaction_policy: RedactionPolicy::Mask,
            context: None,
        }
    }

    #[test]
    fn test_name_pair_union() {
        let words = vec![word("John", 10.0), word("Smith", 60.0), word("lives", 110.0)];
        let region = VisualAligner::new()
            .align(&entity("John Smith", EntityLabel::PersonName), &words)
            .unwrap();
        assert_eq!(region.strategy, AlignStrategy::NamePair);
        assert_eq!(region.bounding_box, BoundingBox::new(10.0, 100.0, 90.0, 12.0));
        assert_eq!(region.text, "John Smith");
    }

    #[test]
    fn test_token_overlap_for_non_names() {
        let words = vec![
            word("Account:", 0.0),
            word("1234-5678", 50.0),
            word("due", 100.0),
        ];
        let region = VisualAligner::new()
            .align(&entity("1234-5678", EntityLabel::AccountNumber), &words)
            .unwrap();
        assert_eq!(region.strategy, AlignStrategy::TokenOverlap);
        assert_eq!(region.text, "1234-5678");
        assert_eq!(region.bounding_box.x, 50.0);
    }

    #[test]
    fn test_longest_span_wins() {
        let words = vec![
            word("Acme", 0.0),
            word("invoice", 50.0),
            word("from", 100.0),
            word("Acme", 150.0),
            word("Holdings", 200.0),
        ];
        let region = VisualAligner::new()
            .align(&entity("Acme Holdings", EntityLabel::CompanyName), &words)
            .unwrap();
        assert_eq!(region.text, "Acme Holdings");
        assert_eq!(region.bounding_box, BoundingBox::new(150.0, 100.0, 90.0, 12.0));
    }

    #[test]
    fn test_ties_keep_first_span() {
        let words = vec![word("Pune", 0.0), word("and", 50.0), word("Pune", 100.0)];
        let region = VisualAligner::new()
            .align(&entity("Pune", EntityLabel::Location), &words)
            .unwrap();
        assert_eq!(region.bounding_box.x, 0.0);
    }

    #[test]
    fn test_fuzzy_fallback() {
        let words = vec![word("Jonathon", 0.0), word("xyz", 50.0)];
        // "jonathan" vs "jonathon": one substitution, similarity 0.875.
        let region = VisualAligner::new()
            .align(&entity("Jonathan", EntityLabel::Organization), &words)
            .unwrap();
        assert_eq!(region.strategy, AlignStrategy::Fuzzy);
        assert_eq!(region.text, "Jonathon");
    }

    #[test]
    fn test_fuzzy_unions_three_best_matches() {
        // Similarities to "jonathan": 0.875, 0.875, 0.75 and 0.625 clear the
        // threshold; "Invoice" does not. The 0.625 word sits furthest right.
        let words = vec![
            word("Jonathon", 0.0),
            word("Invoice", 50.0),
            word("Jonathen", 100.0),
            word("Jonathxx", 200.0),
            word("Jonatxxx", 300.0),
        ];
        let region = VisualAligner::new()
            .align(&entity("Jonathan", EntityLabel::Organization), &words)
            .unwrap();

        assert_eq!(region.strategy, AlignStrategy::Fuzzy);
        assert_eq!(region.text, "Jonathon Jonathen Jonathxx");
        assert_eq!(region.bounding_box, BoundingBox::new(0.0, 100.0, 240.0, 12.0));
    }

    #[test]
    fn test_name_pair_inside_longer_name() {
        let words = vec![word("Mr", 0.0), word("John", 50.0), word("Smith", 100.0), word("Jr", 150.0)];
        let region = VisualAligner::new()
            .align(&entity("John Smith Jr", EntityLabel::PersonName), &words)
            .unwrap();

        assert_eq!(region.strategy, AlignStrategy::NamePair);
        assert_eq!(region.text, "John Smith");
        assert_eq!(region.bounding_box, BoundingBox::new(50.0, 100.0, 90.0, 12.0));
    }

    #[test]
    fn test_no_similar_word_is_absent() {
        let words = vec![word("Invoice", 0.0), word("Total", 50.0), word("Paid", 100.0)];
        assert!(VisualAligner::new()
            .align(&entity("Zzyzx", EntityLabel::Organization), &words)
            .is_none());
    }

    #[test]
    fn test_punctuation_only_entity_is_absent() {
        let words = vec![word("--", 0.0)];
        assert!(VisualAligner::new()
            .align(&entity("--", EntityLabel::Misc), &words)
            .is_none());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("josé", "jose"), 1);
        assert_eq!(similarity("", ""), 1.0);
        assert!((similarity("abcd", "abcf") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("Smith,"), "smith");
        assert_eq!(normalize_token("(555)"), "555");
        assert_eq!(normalize_token("José"), "josé");
    }
}
