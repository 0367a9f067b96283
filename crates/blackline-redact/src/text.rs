//! Policy-driven text redaction.

use blackline_core::{Entity, RedactionPolicy};
use tracing::{debug, warn};

pub const BLOCK_CHAR: char = '█';
/// Default MASK character. Set `TextRedactor::mask` to `BLOCK_CHAR` to mask with blocks.
pub const MASK_CHAR: char = '*';

/// Replaces each entity span with its policy's redacted value.
#[derive(Debug, Clone, Copy)]
pub struct TextRedactor {
    pub block: char,
    pub mask: char,
}

impl Default for TextRedactor {
    fn default() -> Self {
        Self {
            block: BLOCK_CHAR,
            mask: MASK_CHAR,
        }
    }
}

impl TextRedactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redacted replacement for `text` under `policy`. Lengths are in
    /// characters.
    pub fn redacted_value(&self, text: &str, policy: RedactionPolicy) -> String {
        let len = text.chars().count();
        match policy {
            RedactionPolicy::Full => repeat(self.block, len.max(3)),
            RedactionPolicy::Partial if len <= 3 => repeat(self.block, len),
            RedactionPolicy::Partial => {
                let mut chars = text.chars();
                let first = chars.next().unwrap_or(self.block);
                let last = chars.next_back().unwrap_or(self.block);
                let mut out = String::with_capacity(len * 3);
                out.push(first);
                out.extend(std::iter::repeat(self.block).take(len - 2));
                out.push(last);
                out
            }
            RedactionPolicy::Hash => format!("[REDACTED-{}]", len),
            RedactionPolicy::Mask => repeat(self.mask, len),
        }
    }

    /// Apply every entity to `source`.
    ///
    /// Entities are processed in ascending `start` order; the running
    /// offset is the total length change of earlier splices. Entities that
    /// fall outside the source or overlap an earlier one are skipped.
    pub fn redact(&self, source: &str, entities: &[Entity]) -> String {
        let source_len = source.chars().count();
        let mut ordered: Vec<&Entity> = entities.iter().collect();
        ordered.sort_by_key(|e| (e.start, e.end));

        let (chars, _, applied, _) = ordered.into_iter().fold(
            (source.chars().collect::<Vec<char>>(), 0isize, 0usize, 0usize),
            |(mut chars, offset, applied, last_end), entity| {
                if !entity.is_within(source_len) || entity.start < last_end {
                    warn!(
                        "Skipping {:?} span {}..{} (source {} chars)",
                        entity.label, entity.start, entity.end, source_len
                    );
                    return (chars, offset, applied, last_end);
                }

                let redacted: Vec<char> = self
                    .redacted_value(&entity.text, entity.redaction_policy)
                    .chars()
                    .collect();
                let start = (entity.start as isize + offset) as usize;
                let end = (entity.end as isize + offset) as usize;
                let width = redacted.len() as isize - (entity.end - entity.start) as isize;
                chars.splice(start..end, redacted);
                (chars, offset + width, applied + 1, entity.end)
            },
        );

        debug!("Applied {} redactions", applied);
        chars.into_iter().collect()
    }
}

fn repeat(c: char, n: usize) -> String {
    std::iter::repeat(c).take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackline_core::{EntityLabel, RiskLevel};

    fn entity(source: &str, start: usize, end: usize, policy: RedactionPolicy) -> Entity {
        Entity {
            text: source.chars().skip(start).take(end - start).collect(),
            label: EntityLabel::Misc,
            confidence: 0.95,
            start,
            end,
            risk_level: RiskLevel::High,
            redaction_policy: policy,
            context: None,
        }
    }

    #[test]
    fn test_full_policy() {
        let r = TextRedactor::new();
        let source = "SSN: 123-45-6789";
        let out = r.redact(source, &[entity(source, 5, 16, RedactionPolicy::Full)]);
        assert_eq!(out, "SSN: ███████████");
    }

    #[test]
    fn test_full_policy_minimum_three() {
        let r = TextRedactor::new();
        assert_eq!(r.redacted_value("7", RedactionPolicy::Full), "███");
        let source = "ID 7 ok";
        assert_eq!(r.redact(source, &[entity(source, 3, 4, RedactionPolicy::Full)]), "ID ███ ok");
    }

    #[test]
    fn test_hash_policy() {
        let r = TextRedactor::new();
        let source = "john.smith@example.com";
        let out = r.redact(source, &[entity(source, 0, 22, RedactionPolicy::Hash)]);
        assert_eq!(out, "[REDACTED-22]");
    }

    #[test]
    fn test_partial_policy() {
        let r = TextRedactor::new();
        assert_eq!(r.redacted_value("Maria", RedactionPolicy::Partial), "M███a");
        assert_eq!(r.redacted_value("Ana", RedactionPolicy::Partial), "███");
        assert_eq!(r.redacted_value("Al", RedactionPolicy::Partial), "██");
    }

    #[test]
    fn test_mask_policy() {
        let r = TextRedactor::new();
        assert_eq!(r.redacted_value("555-1234", RedactionPolicy::Mask), "********");
    }

    #[test]
    fn test_block_mask_matches_full_width() {
        let r = TextRedactor {
            mask: BLOCK_CHAR,
            ..TextRedactor::default()
        };
        let masked = r.redacted_value("555-1234", RedactionPolicy::Mask);
        assert_eq!(masked, "████████");
        assert_eq!(masked, r.redacted_value("555-1234", RedactionPolicy::Full));
        assert_eq!(r.redact("Call 555-1234", &[entity("Call 555-1234", 5, 13, RedactionPolicy::Mask)]), "Call ████████");
    }

    #[test]
    fn test_offset_drift_across_entities() {
        let r = TextRedactor::new();
        let source = "Mail a@b.io then SSN 1 and Eve Ray";
        let entities = vec![
            entity(source, 27, 30, RedactionPolicy::Mask),
            entity(source, 5, 11, RedactionPolicy::Hash),
            entity(source, 21, 22, RedactionPolicy::Full),
        ];
        let out = r.redact(source, &entities);
        assert_eq!(out, "Mail [REDACTED-6] then SSN ███ and *** Ray");
    }

    #[test]
    fn test_multibyte_source() {
        let r = TextRedactor::new();
        let source = "Café José 42";
        let out = r.redact(source, &[entity(source, 5, 9, RedactionPolicy::Partial)]);
        assert_eq!(out, "Café J██é 42");
    }

    #[test]
    fn test_invalid_and_overlapping_skipped() {
        let r = TextRedactor::new();
        let source = "abcdefgh";
        let mut bad = entity(source, 2, 4, RedactionPolicy::Mask);
        bad.end = 40;
        let first = entity(source, 0, 4, RedactionPolicy::Mask);
        let overlapping = entity(source, 3, 6, RedactionPolicy::Mask);
        let out = r.redact(source, &[bad, first, overlapping]);
        assert_eq!(out, "****efgh");
    }

    #[test]
    fn test_no_entities_is_identity() {
        assert_eq!(TextRedactor::new().redact("unchanged", &[]), "unchanged");
    }
}
