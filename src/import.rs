/// Import merger module
///
/// Runtime-imported question sets (converter output, shared files, remote
/// payloads already parsed by the transport) are normalized through the
/// same schema normalizer as bundled content, persisted under synthetic
/// `imported/...` paths that no bundled file can collide with, and
/// surfaced through a separate imported-index record. The bundled index
/// is never rewritten.
use crate::catalog;
use crate::dto::QuestionFileDocument;
use crate::errors::DataError;
use crate::loader::IMPORTED_PATH_PREFIX;
use crate::models::{CatalogIndex, Question, QuestionFileRef, subject_key};
use crate::normalize;
use crate::store::{KvStore, keys};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Placement and provenance for one import
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub test_name: String,
    pub subject: Option<String>,
    pub series_no: String,
    pub source: Option<String>,
    pub display_name: Option<String>,
}

/// One imported file, as recorded in the imported index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedFileEntry {
    #[serde(flatten)]
    pub file_ref: QuestionFileRef,
    pub import_id: String,
    pub imported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The aggregated imported-index record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImportedIndex {
    pub entries: Vec<ImportedFileEntry>,
}

/// The synthetic resource path for an imported series
///
/// Lives under `imported/`, which the loader serves version-independently
/// and which never collides with a bundled path.
pub fn imported_file_path(test_name: &str, subject: Option<&str>, series_no: &str) -> String {
    let subject = subject_key(subject);
    let subject_segment = if subject.is_empty() { "-" } else { subject.as_str() };
    format!("{}{}/{}/{}.json", IMPORTED_PATH_PREFIX, test_name, subject_segment, series_no)
}

/// Normalizes an externally supplied question document
///
/// The import args define placement; ids come out as
/// `testName[_subject]_seriesNo_ordinal` like any bundled file.
///
/// ### Errors
///
/// `DataError::ImportValidation` when the payload is not a question
/// document or contains no usable records. Surfaced to the user as-is,
/// never auto-retried.
pub fn normalize_import(
    raw_doc: &Value,
    test_name: &str,
    subject: Option<&str>,
    series_no: &str,
) -> Result<Vec<Question>, DataError> {
    let parsed: QuestionFileDocument = serde_json::from_value(raw_doc.clone()).map_err(|_| {
        DataError::ImportValidation(
            "The file is not a recognized question document; expected a question list".to_string(),
        )
    })?;
    let (_, records) = parsed.into_parts();

    if records.is_empty() {
        return Err(DataError::ImportValidation(
            "The file contains no questions".to_string(),
        ));
    }

    let mut questions = Vec::with_capacity(records.len());
    for (index, raw) in records.iter().enumerate() {
        let ordinal = (index + 1) as u32;
        if !raw.is_object() {
            warn!(ordinal, "Skipping non-object record in import payload");
            continue;
        }
        questions.push(normalize::normalize(raw, ordinal, test_name, subject, series_no));
    }

    if questions.is_empty() {
        return Err(DataError::ImportValidation(
            "None of the records in the file are usable questions".to_string(),
        ));
    }

    Ok(questions)
}

/// Imports a question document: normalize, persist, index
///
/// Re-importing the same placement overwrites the stored file and updates
/// its index entry in place — the imported index never grows duplicate
/// rows for one path.
#[instrument(skip(kv, raw_doc), fields(test_name = %request.test_name, series_no = %request.series_no))]
pub async fn import_questions(
    kv: &KvStore,
    raw_doc: &Value,
    request: &ImportRequest,
) -> Result<ImportedFileEntry, DataError> {
    let questions = normalize_import(
        raw_doc,
        &request.test_name,
        request.subject.as_deref(),
        &request.series_no,
    )?;

    let file_path = imported_file_path(
        &request.test_name,
        request.subject.as_deref(),
        &request.series_no,
    );

    // Stored in the simplified file-document generation; the cache
    // normalizes it again on load, which is a fixed point.
    let document = json!({
        "importDate": Utc::now().to_rfc3339(),
        "source": request.source,
        "questions": questions,
    });
    kv.put(&format!("{}{}", keys::IMPORTED_RESOURCE_PREFIX, file_path), &document)
        .await?;

    let entry = ImportedFileEntry {
        file_ref: QuestionFileRef {
            test_name: request.test_name.clone(),
            subject: request.subject.clone(),
            series_no: request.series_no.clone(),
            file_path: file_path.clone(),
            count: questions.len() as u32,
            display_name: request.display_name.clone(),
        },
        import_id: Uuid::new_v4().to_string(),
        imported_at: Utc::now(),
        source: request.source.clone(),
    };

    let mut index = load_imported_index(kv)?;
    index.entries.retain(|e| e.file_ref.file_path != file_path);
    index.entries.push(entry.clone());
    kv.put(keys::IMPORTED_INDEX, &index).await?;

    info!(
        "Imported {} questions as `{}`",
        entry.file_ref.count, file_path
    );
    Ok(entry)
}

/// Reads the imported index, treating absence as empty
pub fn load_imported_index(kv: &KvStore) -> Result<ImportedIndex, DataError> {
    Ok(kv.get::<ImportedIndex>(keys::IMPORTED_INDEX)?.unwrap_or_default())
}

/// Folds imported entries into the live catalog
///
/// Idempotent: entries whose file path is already present are skipped, so
/// re-running after a reload (or calling twice) never duplicates rows.
/// Bundled refs and summaries are left untouched beyond total re-derivation.
///
/// ### Returns
///
/// The number of newly appended file refs
pub fn merge_imported_index(catalog_index: &mut CatalogIndex, imported: &ImportedIndex) -> usize {
    let mut appended = 0;
    for entry in &imported.entries {
        let already_present = catalog_index
            .question_files
            .iter()
            .any(|r| r.file_path == entry.file_ref.file_path);
        if already_present {
            continue;
        }
        catalog_index.question_files.push(entry.file_ref.clone());
        appended += 1;
    }

    if appended > 0 {
        catalog::ensure_summary_rows(catalog_index);
        catalog::rebuild_totals(catalog_index);
    }
    appended
}
