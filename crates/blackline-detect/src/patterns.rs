//! Deterministic PII detection using a fixed table of regex rules.

use blackline_core::{Entity, EntityLabel, RedactionPolicy, RiskLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::span::{CharIndex, CONTEXT_RADIUS};

/// Confidence assigned to every pattern match.
pub const PATTERN_CONFIDENCE: f64 = 0.95;

/// One named detection rule.
pub struct PatternRule {
    pub label: EntityLabel,
    pub risk_level: RiskLevel,
    pub redaction_policy: RedactionPolicy,
    regex: Regex,
    /// Identifier rules accept any alphanumeric token after a keyword; the
    /// captured value must contain a digit to count.
    require_digit: bool,
}

impl PatternRule {
    fn new(label: EntityLabel, pattern: &str, risk_level: RiskLevel, policy: RedactionPolicy) -> Self {
        Self {
            label,
            risk_level,
            redaction_policy: policy,
            regex: Regex::new(pattern).expect("pattern rule must compile"),
            require_digit: false,
        }
    }

    fn digits(mut self) -> Self {
        self.require_digit = true;
        self
    }
}

const NAME_PAIR: &str = r"([A-Z][a-z]+\s+[A-Z][a-z]+)";

/// Legal-role rule: case-insensitive keyword, case-sensitive capitalized name.
fn role(label: EntityLabel, keywords: &str, risk: RiskLevel, policy: RedactionPolicy) -> PatternRule {
    let pattern = format!(r"\b(?i:{})[\s:]*{}\b", keywords, NAME_PAIR);
    PatternRule::new(label, &pattern, risk, policy)
}

static RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    use EntityLabel as L;
    use RedactionPolicy::*;
    use RiskLevel::*;

    vec![
        PatternRule::new(L::Ssn, r"\b(?:\d{3}[-.\s]?\d{2}[-.\s]?\d{4})\b", Critical, Full),
        PatternRule::new(
            L::CreditCard,
            r"\b(?:\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4})\b",
            Critical,
            Full,
        ),
        PatternRule::new(L::AccountNumber, r"(?i)\b(?:Account|Acct)[\s#:]*(\d{8,17})\b", Critical, Full),
        PatternRule::new(L::RoutingNumber, r"(?i)\b(?:Routing|ABA|RTN)[\s#:]*(\d{9})\b", Critical, Full),
        PatternRule::new(L::Email, r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", High, Hash),
        PatternRule::new(
            L::Phone,
            r"(?:\(\d{3}\)\s?\d{3}[-.\s]?\d{4}|\d{3}[-.\s]?\d{3}[-.\s]?\d{4}|\+1[-.\s]?\d{3}[-.\s]?\d{3}[-.\s]?\d{4}|1[-.\s]?\d{3}[-.\s]?\d{3}[-.\s]?\d{4})",
            High,
            Mask,
        ),
        PatternRule::new(
            L::InvoiceNumber,
            r"(?i)\b(?:Invoice|INV|Invoice\s*#)[\s#:]*([A-Z0-9-]{6,20})\b",
            Medium,
            Partial,
        )
        .digits(),
        PatternRule::new(
            L::TransactionId,
            r"(?i)\b(?:Transaction|Trans|TXN)[\s#:]*([A-Z0-9-]{8,25})\b",
            High,
            Full,
        )
        .digits(),
        PatternRule::new(
            L::DateOfBirth,
            r"(?i)\b(?:DOB|Date of Birth)[\s:]*(\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4})\b",
            Critical,
            Full,
        ),
        PatternRule::new(L::TaxId, r"(?i)\b(?:EIN|Tax ID)[\s#:]*(\d{2}-?\d{7})\b", Critical, Full),
        PatternRule::new(L::DriversLicense, r"(?i)\b(?:DL|License)[\s#:]*([A-Z0-9]{6,12})\b", High, Full)
            .digits(),
        PatternRule::new(L::Passport, r"(?i)\bPassport[\s#:]*([A-Z]\d{8})\b", Critical, Full),
        PatternRule::new(L::BankAccount, r"(?i)\b(?:Bank|Account)[\s#:]*(\d{10,17})\b", Critical, Full),
        PatternRule::new(L::LoanNumber, r"(?i)\b(?:Loan|Loan\s*#)[\s#:]*([A-Z0-9-]{8,20})\b", High, Full)
            .digits(),
        PatternRule::new(
            L::PolicyNumber,
            r"(?i)\b(?:Policy|Policy\s*#)[\s#:]*([A-Z0-9-]{8,20})\b",
            High,
            Full,
        )
        .digits(),
        PatternRule::new(
            L::ReferenceNumber,
            r"(?i)\b(?:Ref|Reference|Ref\s*#)[\s#:]*([A-Z0-9-]{6,20})\b",
            Medium,
            Partial,
        )
        .digits(),
        PatternRule::new(L::PoNumber, r"(?i)\b(?:P\.O\.|PO)[\s#:]*(\d{4,12})\b", Medium, Partial),
        PatternRule::new(
            L::Name,
            r"(?m)\b(?:Bill To|Ship To)[\s:]*([A-Z][a-z]+\s+[A-Z][a-z]+)\b|^[ \t]*([A-Z][a-z]+[ \t]+[A-Z][a-z]+)[ \t]*$",
            High,
            Mask,
        ),
        PatternRule::new(L::PersonName, r"\b[A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b", High, Mask),
        PatternRule::new(
            L::CompanyName,
            r"\b[A-Z][a-z]+\s+(?:Inc|Corp|LLC|Ltd|Company|Co)\.?\b",
            Medium,
            Partial,
        ),
        PatternRule::new(
            L::Date,
            r"(?i)\b(?:\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{4}[-/]\d{1,2}[-/]\d{1,2}|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\s+\d{1,2},?\s+\d{4})\b",
            Medium,
            Mask,
        ),
        PatternRule::new(
            L::MonetaryAmount,
            r"(?i)\$[\d,]+\.?\d*|\b\d+[,.]?\d*\s*(?:USD|dollars?|cents?)\b",
            Medium,
            Mask,
        ),
        PatternRule::new(
            L::Address,
            r"(?i)\b\d+\s+[A-Za-z\s]+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Circle|Cir|Court|Ct|Place|Pl|Square|Sq|Way|Trail|Trl|Terrace|Ter|Parkway|Pkwy)\b",
            High,
            Partial,
        ),
        PatternRule::new(L::CustomerId, r"(?i)\b(?:Customer|Cust|ID)[\s#:]*([A-Z0-9-]{6,15})\b", High, Full)
            .digits(),
        PatternRule::new(L::Signature, r"(?i)\b(?:Signature|Sign)[\s:]*([A-Za-z ]{3,30})\b", High, Full),
        PatternRule::new(
            L::CaseNumber,
            r"(?i)\b(?:Case|Docket|Docket\s*#)[\s#:]*([A-Z0-9-]{6,20})\b",
            Medium,
            Partial,
        )
        .digits(),
        PatternRule::new(L::DocketNumber, r"(?i)\b(?:Docket|Dkt)[\s#:]*([A-Z0-9-]{6,20})\b", Medium, Partial)
            .digits(),
        role(L::JudgeName, r"Judge|Hon\.|Honorable", Medium, Partial),
        role(L::AttorneyName, r"Attorney|Counsel|Lawyer", Medium, Partial),
        role(L::WitnessName, r"Witness|Testifying", High, Mask),
        role(L::PlaintiffName, r"Plaintiff|Petitioner", High, Mask),
        role(L::DefendantName, r"Defendant|Respondent", High, Mask),
        role(L::VictimName, r"Victim|Complainant", Critical, Full),
        role(L::MinorName, r"Minor|Child|Juvenile", Critical, Full),
        role(L::ExpertWitness, r"Expert|Dr\.|Doctor", High, Mask),
        role(L::CourtClerk, r"Clerk|Court Clerk", Medium, Partial),
    ]
});

/// Regex-driven PII detector. Stateless; safe to share across threads.
pub struct PatternDetector {
    rules: &'static [PatternRule],
}

impl PatternDetector {
    pub fn new() -> Self {
        Self { rules: &RULES }
    }

    /// Number of rules in the table.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Every match of every rule, in rule order then position order.
    /// Candidates may overlap; the reconciler resolves that.
    pub fn detect(&self, text: &str) -> Vec<Entity> {
        if text.is_empty() {
            return Vec::new();
        }

        let index = CharIndex::new(text);
        let mut entities = Vec::new();

        for rule in self.rules {
            for caps in rule.regex.captures_iter(text) {
                // Captured group when the rule has one, else the whole match.
                let Some(m) = caps.iter().skip(1).flatten().next().or_else(|| caps.get(0)) else {
                    continue;
                };
                if m.start() == m.end() {
                    continue;
                }
                if rule.require_digit && !m.as_str().chars().any(|c| c.is_ascii_digit()) {
                    continue;
                }

                let start = index.char_offset(m.start());
                let end = index.char_offset(m.end());
                entities.push(Entity {
                    text: m.as_str().to_string(),
                    label: rule.label,
                    confidence: PATTERN_CONFIDENCE,
                    start,
                    end,
                    risk_level: rule.risk_level,
                    redaction_policy: rule.redaction_policy,
                    context: Some(index.context(start, end, CONTEXT_RADIUS)),
                });
            }
        }

        debug!("Pattern detector: {} candidates", entities.len());
        entities
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}
