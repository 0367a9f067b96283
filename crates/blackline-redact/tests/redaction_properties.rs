use blackline_core::{Entity, EntityLabel, RedactionPolicy, RiskLevel};
use blackline_redact::TextRedactor;
use proptest::prelude::*;

fn policy_strategy() -> impl Strategy<Value = RedactionPolicy> {
    prop_oneof![
        Just(RedactionPolicy::Full),
        Just(RedactionPolicy::Partial),
        Just(RedactionPolicy::Hash),
        Just(RedactionPolicy::Mask),
    ]
}

fn expected_len(len: usize, policy: RedactionPolicy) -> usize {
    match policy {
        RedactionPolicy::Full => len.max(3),
        RedactionPolicy::Partial => len,
        RedactionPolicy::Hash => format!("[REDACTED-{}]", len).len(),
        RedactionPolicy::Mask => len,
    }
}

proptest! {
    #[test]
    fn redacted_value_length_follows_policy(text in "[a-zA-Zé0-9@. -]{1,40}", policy in policy_strategy()) {
        let len = text.chars().count();
        let out = TextRedactor::new().redacted_value(&text, policy);
        prop_assert_eq!(out.chars().count(), expected_len(len, policy));
    }

    #[test]
    fn text_outside_spans_is_untouched(
        prefix in "[a-z ]{0,20}",
        secret in "[A-Za-z0-9]{1,20}",
        suffix in "[a-z ]{0,20}",
        policy in policy_strategy(),
    ) {
        let source = format!("{}{}{}", prefix, secret, suffix);
        let start = prefix.chars().count();
        let end = start + secret.chars().count();
        let entity = Entity {
            text: secret.clone(),
            label: EntityLabel::Misc,
            confidence: 0.9,
            start,
            end,
            risk_level: RiskLevel::High,
            redaction_policy: policy,
            context: None,
        };
        let redactor = TextRedactor::new();
        let out = redactor.redact(&source, &[entity]);
        let expected = format!("{}{}{}", prefix, redactor.redacted_value(&secret, policy), suffix);
        prop_assert_eq!(out, expected);
    }
}
