use serde::{Deserialize, Serialize};

/// One index entry pointing at a concrete per-file question document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFileRef {
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub series_no: String,
    /// Opaque resource name handed to the loader
    pub file_path: String,
    /// Expected question count, per the index document
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Top-level exam grouping summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNameSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub total_questions: u32,
    pub completed_questions: u32,
    pub completion_percentage: u32,
}

/// Mid-level grouping summary within a test name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub test_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub total_questions: u32,
    pub completed_questions: u32,
    pub completion_percentage: u32,
}

/// One exam edition/sitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub series_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub total_questions: u32,
    pub completed_questions: u32,
    pub completion_percentage: u32,
    /// Frozen the last time the series was fully answered; an incomplete
    /// series keeps whatever was frozen before
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// The normalized in-memory catalog, built once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIndex {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub test_names: Vec<TestNameSummary>,
    pub subjects: Vec<SubjectSummary>,
    pub series: Vec<SeriesSummary>,
    pub question_files: Vec<QuestionFileRef>,
}

/// Canonical subject comparison
///
/// The hierarchy's subject layer is optional, and legacy index documents
/// record its absence as either a missing field or an empty string. Those
/// two spellings are equivalent; a populated subject matches only the
/// identical populated subject, never a wildcard.
pub fn subject_matches(a: Option<&str>, b: Option<&str>) -> bool {
    normalized_subject(a) == normalized_subject(b)
}

/// A grouping key for the subject layer, folding absent and empty together
pub fn subject_key(subject: Option<&str>) -> String {
    normalized_subject(subject).unwrap_or_default().to_string()
}

fn normalized_subject(subject: Option<&str>) -> Option<&str> {
    match subject.map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s),
    }
}

impl CatalogIndex {
    /// Finds the file ref for an exact (testName, subject, seriesNo)
    /// triple. A request without a subject matches only refs whose
    /// subject is absent or empty.
    pub fn get_file_ref(
        &self,
        test_name: &str,
        subject: Option<&str>,
        series_no: &str,
    ) -> Option<&QuestionFileRef> {
        self.question_files.iter().find(|r| {
            r.test_name == test_name
                && r.series_no == series_no
                && subject_matches(r.subject.as_deref(), subject)
        })
    }

    /// All refs under one test name
    pub fn refs_for_test(&self, test_name: &str) -> Vec<&QuestionFileRef> {
        self.question_files
            .iter()
            .filter(|r| r.test_name == test_name)
            .collect()
    }

    /// All refs under one (testName, subject) pair
    pub fn refs_for_subject(&self, test_name: &str, subject: Option<&str>) -> Vec<&QuestionFileRef> {
        self.question_files
            .iter()
            .filter(|r| r.test_name == test_name && subject_matches(r.subject.as_deref(), subject))
            .collect()
    }
}
