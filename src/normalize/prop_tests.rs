use super::*;
use proptest::prelude::*;
use serde_json::json;

/// Tokens the answer resolver must map to exactly one of A..D
fn valid_single_tokens() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec!["1", "2", "3", "4"]).prop_map(String::from),
        prop::sample::select(vec!["a", "b", "c", "d", "A", "B", "C", "D"]).prop_map(String::from),
    ]
}

/// Whether a token is one the resolver recognizes on its own
fn is_recognized_token(token: &str) -> bool {
    let trimmed = token.trim();
    matches!(trimmed, "1" | "2" | "3" | "4")
        || (trimmed.len() == 1
            && trimmed.chars().next().is_some_and(|c| {
                c.is_ascii_alphabetic() && c.to_ascii_uppercase() <= 'E'
            }))
}

proptest! {
    /// Every token in {1..4, a..d, A..D} resolves to exactly one of
    /// {A, B, C, D}, with no recovery
    #[test]
    fn prop_valid_tokens_resolve_cleanly(token in valid_single_tokens()) {
        let (answer, recovered) = resolve_answer(&token);

        prop_assert!(["A", "B", "C", "D"].contains(&answer.as_str()),
            "token {:?} resolved to {:?}", token, answer);
        prop_assert!(!recovered);
    }

    /// Any other single token recovers as "A" with exactly one warning
    #[test]
    fn prop_unrecognized_tokens_recover_once(token in "[^,，]{0,12}") {
        prop_assume!(!is_recognized_token(&token));

        let (answer, recovered) = resolve_answer(&token);

        prop_assert_eq!(answer, "A");
        prop_assert!(recovered);
    }

    /// Normalizing canonical output again is a fixed point for options,
    /// answer, and explanation
    #[test]
    fn prop_normalize_idempotent(
        content in "\\PC{0,40}",
        a in "\\PC{1,10}",
        b in "\\PC{1,10}",
        c in "\\PC{0,10}",
        d in "\\PC{0,10}",
        ans in valid_single_tokens(),
        exp in "\\PC{0,20}",
        ordinal in 1u32..500,
    ) {
        let raw = json!({
            "content": content,
            "A": a, "B": b, "C": c, "D": d,
            "Ans": ans,
            "Exp": exp,
        });

        let first = normalize(&raw, ordinal, "T1", Some("S1"), "001");
        let canonical = serde_json::to_value(&first).unwrap();
        let second = normalize(&canonical, ordinal, "T1", Some("S1"), "001");

        prop_assert_eq!(second.id, first.id);
        prop_assert_eq!(second.option_a, first.option_a);
        prop_assert_eq!(second.option_b, first.option_b);
        prop_assert_eq!(second.option_c, first.option_c);
        prop_assert_eq!(second.option_d, first.option_d);
        prop_assert_eq!(second.correct_answer, first.correct_answer);
        prop_assert_eq!(second.explanation, first.explanation);
        prop_assert_eq!(second.question_type, first.question_type);
    }
}
