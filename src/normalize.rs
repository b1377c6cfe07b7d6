/// Schema normalizer module
///
/// Question files come in several incompatible legacy shapes produced by
/// different converter generations. This module maps any supported raw
/// record to one canonical [`Question`], with an explicit field-resolution
/// priority list: the newer key is preferred, the legacy key is the
/// fallback, and the empty string is the last resort. Per-record problems
/// are recovered, never raised — one odd record must not take down its
/// file.
use crate::models::{Question, QuestionType, subject_key};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

/// Leading ordinal prefix in prompt text ("3. ", "3、"), left behind by
/// converters that kept the printed numbering. Anchored so only a true
/// prefix is touched.
static ORDINAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,3}\s*[.、．]\s*").expect("valid ordinal prefix pattern"));

/// Builds the deterministic question id for a file position
///
/// `testName[_subject]_seriesNo_ordinal`; the subject segment is omitted
/// when the subject layer is absent. Ids derive from position, so
/// reordering a source file changes them — which is why a dataset-version
/// change invalidates persisted answers.
pub fn question_id(test_name: &str, subject: Option<&str>, series_no: &str, ordinal: u32) -> String {
    let subject = subject_key(subject);
    if subject.is_empty() {
        format!("{}_{}_{}", test_name, series_no, ordinal)
    } else {
        format!("{}_{}_{}_{}", test_name, subject, series_no, ordinal)
    }
}

/// Maps a raw question record to the canonical shape
///
/// ### Arguments
///
/// * `raw` - The record as parsed JSON, any supported generation
/// * `ordinal` - 1-based position of the record in its source file
/// * `test_name`, `subject`, `series_no` - Placement in the hierarchy,
///   taken from file metadata or the file ref
///
/// Never fails: unresolvable fields become empty strings and an
/// unrecognized answer token is recovered as "A" with one logged warning.
pub fn normalize(
    raw: &Value,
    ordinal: u32,
    test_name: &str,
    subject: Option<&str>,
    series_no: &str,
) -> Question {
    let id = question_id(test_name, subject, series_no, ordinal);

    let content = strip_ordinal_prefix(&resolve_str(raw, &["content", "Q"]));
    let explanation = resolve_str(raw, &["explanation", "exp", "Exp"]);

    let option_a = resolve_option(raw, "A");
    let option_b = resolve_option(raw, "B");
    let option_c = resolve_option(raw, "C");
    let option_d = resolve_option(raw, "D");
    let option_e = resolve_option(raw, "E");
    let has_options = [&option_a, &option_b, &option_c, &option_d, &option_e]
        .iter()
        .any(|o| !o.is_empty());

    let explicit_type = resolve_type_tag(raw);
    let raw_answer = resolve_str(raw, &["correctAnswer", "Ans"]);

    // Essay answers are free text; everything else must resolve to
    // option letters.
    let is_essay = explicit_type == Some(QuestionType::Essay) || (explicit_type.is_none() && !has_options);
    let correct_answer = if is_essay {
        raw_answer
    } else {
        let (answer, recovered) = resolve_answer(&raw_answer);
        if recovered {
            warn!(
                question_id = %id,
                raw_answer = %raw_answer,
                "Unrecognized answer value, defaulting to A"
            );
        }
        answer
    };

    let question_type = explicit_type.unwrap_or_else(|| {
        derive_type(
            has_options,
            &correct_answer,
            &option_a,
            &option_b,
            &option_c,
            &option_d,
            &option_e,
        )
    });

    Question {
        id,
        content,
        option_a,
        option_b,
        option_c,
        option_d,
        option_e,
        correct_answer,
        explanation,
        test_name: test_name.to_string(),
        subject: match subject_key(subject).as_str() {
            "" => None,
            s => Some(s.to_string()),
        },
        series_no: series_no.to_string(),
        ordinal,
        question_type,
    }
}

/// Resolves a string field across its generations, in priority order
fn resolve_str(raw: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(text) = raw.get(key).and_then(value_as_string) {
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Resolves one option letter: flat `A..E` first, nested `options.*` second
fn resolve_option(raw: &Value, letter: &str) -> String {
    if let Some(text) = raw.get(letter).and_then(value_as_string) {
        if !text.is_empty() {
            return text;
        }
    }
    raw.get("options")
        .and_then(|o| o.get(letter))
        .and_then(value_as_string)
        .unwrap_or_default()
}

/// Reads an explicit type tag (`type` preferred, legacy `Type`)
fn resolve_type_tag(raw: &Value) -> Option<QuestionType> {
    let tag = resolve_str(raw, &["type", "Type"]);
    if tag.is_empty() { None } else { QuestionType::from_tag(&tag) }
}

/// Legacy files hold answers as strings or bare numbers
fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalizes a choice answer
///
/// Uppercases letters, maps the numeric tokens "1".."4" to "A".."D", and
/// handles comma-joined multi-choice values token by token (both the
/// ASCII and fullwidth comma occur in legacy data). Returns the
/// normalized answer plus whether recovery kicked in: an unrecognized
/// value yields `("A", true)` — exactly one recovery per record, however
/// many tokens were bad.
pub(crate) fn resolve_answer(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    if trimmed.contains([',', '，']) {
        let letters: Option<Vec<String>> = trimmed
            .split([',', '，'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(resolve_answer_token)
            .collect();
        match letters {
            Some(letters) if !letters.is_empty() => (letters.join(","), false),
            _ => ("A".to_string(), true),
        }
    } else {
        match resolve_answer_token(trimmed) {
            Some(letter) => (letter, false),
            None => ("A".to_string(), true),
        }
    }
}

/// Maps one answer token to an option letter
fn resolve_answer_token(token: &str) -> Option<String> {
    match token {
        "1" => return Some("A".to_string()),
        "2" => return Some("B".to_string()),
        "3" => return Some("C".to_string()),
        "4" => return Some("D".to_string()),
        _ => {}
    }

    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() && c.to_ascii_uppercase() <= 'E' => {
            Some(c.to_ascii_uppercase().to_string())
        }
        _ => None,
    }
}

/// Derives the question type when no explicit tag is present
fn derive_type(
    has_options: bool,
    answer: &str,
    a: &str,
    b: &str,
    c: &str,
    d: &str,
    e: &str,
) -> QuestionType {
    if !has_options {
        QuestionType::Essay
    } else if answer.contains(',') {
        QuestionType::MultiChoice
    } else if !a.is_empty() && !b.is_empty() && c.is_empty() && d.is_empty() && e.is_empty() {
        QuestionType::TrueFalse
    } else {
        QuestionType::SingleChoice
    }
}

/// Strips a leading printed-ordinal prefix from prompt text
fn strip_ordinal_prefix(content: &str) -> String {
    ORDINAL_PREFIX.replace(content, "").to_string()
}


#[cfg(test)]
mod prop_tests;
