use serde::Deserialize;
use serde_json::Value;

/// Raw wire shapes for the two external document kinds the loader hands
/// us. These deserialize permissively — multiple converter generations
/// produced these files and the differences are absorbed here and in the
/// normalizer, never by call sites.

/// Top-level index document
#[derive(Deserialize, Debug)]
pub struct IndexDocument {
    #[serde(default)]
    pub metadata: Option<IndexMetadata>,

    #[serde(default, rename = "testNames")]
    pub test_names: Vec<NameEntry>,

    #[serde(default)]
    pub subjects: Vec<RawSubjectEntry>,

    #[serde(default)]
    pub series: Vec<RawSeriesEntry>,

    #[serde(default, rename = "questionFiles")]
    pub question_files: Vec<RawFileEntry>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IndexMetadata {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<String>,
}

/// A name list entry: newer indexes carry objects, older ones plain strings
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum NameEntry {
    Detailed {
        name: String,
        #[serde(default, rename = "displayName")]
        display_name: Option<String>,
    },
    Plain(String),
}

impl NameEntry {
    pub fn name(&self) -> &str {
        match self {
            NameEntry::Plain(name) => name,
            NameEntry::Detailed { name, .. } => name,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            NameEntry::Plain(_) => None,
            NameEntry::Detailed { display_name, .. } => display_name.as_deref(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawSubjectEntry {
    #[serde(rename = "testName")]
    pub test_name: String,

    #[serde(alias = "subject")]
    pub name: String,

    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RawSeriesEntry {
    #[serde(rename = "testName")]
    pub test_name: String,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(rename = "series_no", alias = "seriesNo")]
    pub series_no: String,

    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct RawFileEntry {
    #[serde(rename = "testName")]
    pub test_name: String,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(rename = "series_no", alias = "seriesNo")]
    pub series_no: String,

    pub file: String,

    #[serde(default)]
    pub count: Option<u32>,

    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

/// Per-file question document, any accepted generation
///
/// Legacy files wrap their records with a metadata block, the simplified
/// shape drops metadata (import date/source at most), and the oldest
/// exports are a bare record array.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum QuestionFileDocument {
    Tagged {
        #[serde(default)]
        metadata: Option<FileMetadata>,

        #[serde(default, rename = "importDate")]
        import_date: Option<String>,

        #[serde(default)]
        source: Option<String>,

        questions: Vec<Value>,
    },
    Bare(Vec<Value>),
}

#[derive(Deserialize, Debug, Default)]
pub struct FileMetadata {
    #[serde(default, rename = "testName")]
    pub test_name: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default, rename = "series_no", alias = "seriesNo")]
    pub series_no: Option<String>,
}

impl QuestionFileDocument {
    /// The raw question records, whichever generation carried them
    pub fn into_parts(self) -> (Option<FileMetadata>, Vec<Value>) {
        match self {
            QuestionFileDocument::Tagged { metadata, questions, .. } => (metadata, questions),
            QuestionFileDocument::Bare(questions) => (None, questions),
        }
    }
}
