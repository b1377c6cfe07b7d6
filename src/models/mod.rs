/// Data models module
///
/// This module defines the core data structures used throughout the data
/// layer: normalized questions, per-question answer state, and the catalog
/// hierarchy (test names, subjects, series, file refs).

mod question;
pub use question::{Question, QuestionType};

mod answer;
pub use answer::{AnswerPatch, UserAnswer};

mod catalog;
pub use catalog::{
    CatalogIndex, QuestionFileRef, SeriesSummary, SubjectSummary, TestNameSummary,
    subject_key, subject_matches,
};
