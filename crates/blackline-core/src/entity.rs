//! Detected PII spans and their closed label/risk/policy taxonomies.

use serde::{Deserialize, Serialize};

/// Ordered severity of a detected entity.
///
/// Ordering drives reconciliation priority: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Transformation applied to an entity's text during redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedactionPolicy {
    /// Block characters, at least three.
    Full,
    /// Keep first and last character, block the rest.
    Partial,
    /// `[REDACTED-{len}]` placeholder.
    Hash,
    /// Mask character per original character.
    Mask,
}

/// Closed label taxonomy for detected entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    // Personal
    Person,
    Name,
    PersonName,
    CompanyName,
    Email,
    Phone,
    Address,
    DateOfBirth,
    Signature,

    // Financial
    Ssn,
    AccountNumber,
    RoutingNumber,
    CreditCard,
    BankAccount,
    MonetaryAmount,

    // Government IDs
    Passport,
    DriversLicense,
    TaxId,

    // Document identifiers
    InvoiceNumber,
    TransactionId,
    LoanNumber,
    PolicyNumber,
    ReferenceNumber,
    #[serde(rename = "P_O_NUMBER")]
    PoNumber,
    CustomerId,

    // Legal
    CaseNumber,
    DocketNumber,
    JudgeName,
    AttorneyName,
    WitnessName,
    PlaintiffName,
    DefendantName,
    VictimName,
    MinorName,
    ExpertWitness,
    CourtClerk,

    // General
    Date,
    Organization,
    Location,
    Misc,
}

impl EntityLabel {
    /// Human-readable name shown to reviewers.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Person | Self::Name | Self::PersonName => "Person Name",
            Self::CompanyName => "Company Name",
            Self::Email => "Email Address",
            Self::Phone => "Phone Number",
            Self::Address => "Address",
            Self::DateOfBirth => "Date of Birth",
            Self::Signature => "Signature",
            Self::Ssn => "Social Security Number",
            Self::AccountNumber => "Account Number",
            Self::RoutingNumber => "Routing Number",
            Self::CreditCard => "Credit Card Number",
            Self::BankAccount => "Bank Account Number",
            Self::MonetaryAmount => "Monetary Amount",
            Self::Passport => "Passport Number",
            Self::DriversLicense => "Driver's License",
            Self::TaxId => "Tax ID/EIN",
            Self::InvoiceNumber => "Invoice Number",
            Self::TransactionId => "Transaction ID",
            Self::LoanNumber => "Loan Number",
            Self::PolicyNumber => "Policy Number",
            Self::ReferenceNumber => "Reference Number",
            Self::PoNumber => "P.O. Number",
            Self::CustomerId => "Customer ID",
            Self::CaseNumber => "Case Number",
            Self::DocketNumber => "Docket Number",
            Self::JudgeName => "Judge Name",
            Self::AttorneyName => "Attorney Name",
            Self::WitnessName => "Witness Name",
            Self::PlaintiffName => "Plaintiff Name",
            Self::DefendantName => "Defendant Name",
            Self::VictimName => "Victim Name",
            Self::MinorName => "Minor Name",
            Self::ExpertWitness => "Expert Witness",
            Self::CourtClerk => "Court Clerk",
            Self::Date => "Date",
            Self::Organization => "Organization",
            Self::Location => "Location",
            Self::Misc => "Miscellaneous",
        }
    }

    /// Labels whose text is a person's name, eligible for OCR name pairing.
    pub fn is_person_name(&self) -> bool {
        matches!(
            self,
            Self::Person
                | Self::Name
                | Self::PersonName
                | Self::JudgeName
                | Self::AttorneyName
                | Self::WitnessName
                | Self::PlaintiffName
                | Self::DefendantName
                | Self::VictimName
                | Self::MinorName
                | Self::ExpertWitness
                | Self::CourtClerk
        )
    }
}

/// A detected PII span.
///
/// `start`/`end` are half-open character (not byte) offsets into the
/// original source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub text: String,
    pub label: EntityLabel,
    pub confidence: f64,
    pub start: usize,
    pub end: usize,
    pub risk_level: RiskLevel,
    pub redaction_policy: RedactionPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Entity {
    /// Whether two entities share at least one character index.
    /// Spans that merely touch (`start == other.end`) do not overlap.
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether the span is well-formed for a source of `source_len` characters.
    pub fn is_within(&self, source_len: usize) -> bool {
        self.start < self.end && self.end <= source_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(start: usize, end: usize) -> Entity {
        Entity {
            text: "x".repeat(end - start),
            label: EntityLabel::Misc,
            confidence: 0.9,
            start,
            end,
            risk_level: RiskLevel::Medium,
            redaction_policy: RedactionPolicy::Full,
            context: None,
        }
    }

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_overlap_and_touching() {
        assert!(entity(0, 5).overlaps(&entity(4, 8)));
        assert!(entity(2, 3).overlaps(&entity(0, 10)));
        assert!(!entity(0, 5).overlaps(&entity(5, 8)));
        assert!(!entity(5, 8).overlaps(&entity(0, 5)));
    }

    #[test]
    fn test_entity_wire_shape() {
        let mut e = entity(5, 16);
        e.label = EntityLabel::Ssn;
        e.risk_level = RiskLevel::Critical;
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["label"], "SSN");
        assert_eq!(json["riskLevel"], "CRITICAL");
        assert_eq!(json["redactionPolicy"], "FULL");
        assert!(json.get("context").is_none());
    }

    #[test]
    fn test_label_serialization() {
        assert_eq!(serde_json::to_value(EntityLabel::PoNumber).unwrap(), "P_O_NUMBER");
        assert_eq!(serde_json::to_value(EntityLabel::DateOfBirth).unwrap(), "DATE_OF_BIRTH");
        assert_eq!(
            serde_json::from_str::<EntityLabel>("\"CREDIT_CARD\"").unwrap(),
            EntityLabel::CreditCard
        );
    }

    #[test]
    fn test_person_name_labels() {
        assert!(EntityLabel::Person.is_person_name());
        assert!(EntityLabel::VictimName.is_person_name());
        assert!(!EntityLabel::Ssn.is_person_name());
        assert!(!EntityLabel::CompanyName.is_person_name());
    }
}
