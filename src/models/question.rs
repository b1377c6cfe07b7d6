use serde::{Deserialize, Serialize};

/// The kind of a question, explicit in newer files or derived by the
/// normalizer for legacy records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    TrueFalse,
    Essay,
}

impl QuestionType {
    /// Parses an explicit type tag from a raw record
    ///
    /// Accepts both the current snake_case tags and the short tokens
    /// older converter generations emitted. Returns None for anything
    /// unrecognized so the normalizer falls back to derivation.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "single" | "single_choice" => Some(QuestionType::SingleChoice),
            "multi" | "multiple" | "multi_choice" | "multiple_choice" => {
                Some(QuestionType::MultiChoice)
            }
            "judge" | "true_false" | "truefalse" => Some(QuestionType::TrueFalse),
            "essay" | "short_answer" => Some(QuestionType::Essay),
            _ => None,
        }
    }
}

/// One normalized question
///
/// The id is deterministic: `testName[_subject]_seriesNo_ordinal`, where
/// ordinal is the record's 1-based position in its source file. Reordering
/// a source file therefore changes ids; persisted answers survive only
/// while the dataset version is stable.
///
/// Serialized field names match the newest question-file generation, so a
/// canonical question re-entering the normalizer resolves every field from
/// the preferred key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// Prompt text, with any leading ordinal prefix already stripped
    pub content: String,

    #[serde(rename = "A", default, skip_serializing_if = "String::is_empty")]
    pub option_a: String,

    #[serde(rename = "B", default, skip_serializing_if = "String::is_empty")]
    pub option_b: String,

    #[serde(rename = "C", default, skip_serializing_if = "String::is_empty")]
    pub option_c: String,

    #[serde(rename = "D", default, skip_serializing_if = "String::is_empty")]
    pub option_d: String,

    #[serde(rename = "E", default, skip_serializing_if = "String::is_empty")]
    pub option_e: String,

    /// Single letter, comma-joined letters for multi-choice, or free
    /// text for essay questions
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,

    #[serde(rename = "testName")]
    pub test_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(rename = "seriesNo")]
    pub series_no: String,

    /// 1-based position in the source file
    pub ordinal: u32,

    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

impl Question {
    /// The populated options, as (letter, text) pairs in A..E order
    pub fn options(&self) -> Vec<(&'static str, &str)> {
        [
            ("A", self.option_a.as_str()),
            ("B", self.option_b.as_str()),
            ("C", self.option_c.as_str()),
            ("D", self.option_d.as_str()),
            ("E", self.option_e.as_str()),
        ]
        .into_iter()
        .filter(|(_, text)| !text.is_empty())
        .collect()
    }

    /// Whether any option is populated (essay questions have none)
    pub fn has_options(&self) -> bool {
        !self.option_a.is_empty()
            || !self.option_b.is_empty()
            || !self.option_c.is_empty()
            || !self.option_d.is_empty()
            || !self.option_e.is_empty()
    }
}
