/// Catalog module
///
/// Builds the in-memory catalog from the top-level index document: one
/// summary row per test name, subject, and series, plus the file refs
/// everything else hangs off. The build favors availability over strict
/// consistency — an offline-first client would rather show last-known
/// summaries than nothing — so a failed index load falls back to the
/// previously persisted snapshot before giving up.
use crate::dto::{IndexDocument, NameEntry};
use crate::errors::DataError;
use crate::loader::ResourceLoader;
use crate::models::{
    CatalogIndex, QuestionFileRef, SeriesSummary, SubjectSummary, TestNameSummary, subject_key,
    subject_matches,
};
use crate::store::{KvStore, keys};
use tracing::{info, instrument, warn};

/// The index document's resource name under the dataset version
pub const INDEX_RESOURCE: &str = "index.json";

/// Loads the catalog, preferring the live index over the snapshot
///
/// On success the freshly built catalog is persisted as the new snapshot.
/// When every backend fails, the last snapshot is served degraded (with a
/// warning); only with no snapshot either does the loader's
/// `MissingResource` propagate — at that point there is genuinely nothing
/// to show, though the key-value store itself remains usable.
#[instrument(skip(loader, kv))]
pub async fn load_catalog(loader: &ResourceLoader, kv: &KvStore) -> Result<CatalogIndex, DataError> {
    match fetch_and_build(loader).await {
        Ok(catalog) => {
            if let Err(e) = kv.put(keys::CATALOG_SNAPSHOT, &catalog).await {
                // Losing the snapshot only hurts a later degraded start.
                warn!("Could not persist catalog snapshot: {}", e);
            }
            Ok(catalog)
        }
        Err(load_err) => {
            warn!("Index load failed ({}), trying snapshot", load_err);
            match kv.get::<CatalogIndex>(keys::CATALOG_SNAPSHOT) {
                Ok(Some(snapshot)) => {
                    info!(
                        "Serving catalog from snapshot: {} test names, {} files",
                        snapshot.test_names.len(),
                        snapshot.question_files.len()
                    );
                    Ok(snapshot)
                }
                Ok(None) => Err(load_err),
                Err(e) => {
                    warn!("Snapshot unreadable: {}", e);
                    Err(load_err)
                }
            }
        }
    }
}

async fn fetch_and_build(loader: &ResourceLoader) -> Result<CatalogIndex, DataError> {
    let doc = loader.fetch(INDEX_RESOURCE).await?;
    let parsed: IndexDocument = serde_json::from_value(doc)
        .map_err(|e| DataError::malformed(INDEX_RESOURCE, format!("not an index document: {}", e)))?;
    Ok(build_catalog(parsed, loader.dataset_version()))
}

/// Builds the normalized catalog from a parsed index document
///
/// Explicit summary rows are taken as-is; any test name, subject, or
/// series that only appears via a file ref gets a synthesized row, so the
/// hierarchy is complete even when the index's summary arrays are sparse.
/// Totals always re-derive from the refs.
pub fn build_catalog(doc: IndexDocument, fallback_version: &str) -> CatalogIndex {
    let metadata = doc.metadata.unwrap_or_else(|| {
        warn!("Index document has no metadata block");
        Default::default()
    });

    let mut catalog = CatalogIndex {
        version: metadata
            .version
            .unwrap_or_else(|| fallback_version.to_string()),
        last_updated: metadata.last_updated,
        ..Default::default()
    };

    for entry in &doc.test_names {
        catalog.test_names.push(TestNameSummary {
            name: entry.name().to_string(),
            display_name: entry.display_name().map(String::from),
            total_questions: 0,
            completed_questions: 0,
            completion_percentage: 0,
        });
    }

    for entry in &doc.subjects {
        catalog.subjects.push(SubjectSummary {
            test_name: entry.test_name.clone(),
            name: entry.name.clone(),
            display_name: entry.display_name.clone(),
            total_questions: 0,
            completed_questions: 0,
            completion_percentage: 0,
        });
    }

    for entry in &doc.series {
        catalog.series.push(SeriesSummary {
            test_name: entry.test_name.clone(),
            subject: entry.subject.clone(),
            series_no: entry.series_no.clone(),
            display_name: entry.display_name.clone(),
            total_questions: entry.count.unwrap_or(0),
            completed_questions: 0,
            completion_percentage: 0,
            score: None,
        });
    }

    for entry in doc.question_files {
        catalog.question_files.push(QuestionFileRef {
            test_name: entry.test_name,
            subject: entry.subject,
            series_no: entry.series_no,
            file_path: entry.file,
            count: entry.count.unwrap_or(0),
            display_name: entry.display_name,
        });
    }

    ensure_summary_rows(&mut catalog);
    rebuild_totals(&mut catalog);
    catalog
}

/// Synthesizes summary rows for hierarchy nodes only referenced by file
/// refs
pub fn ensure_summary_rows(catalog: &mut CatalogIndex) {
    let refs = catalog.question_files.clone();
    for r in &refs {
        if !catalog.test_names.iter().any(|t| t.name == r.test_name) {
            catalog.test_names.push(TestNameSummary {
                name: r.test_name.clone(),
                display_name: None,
                total_questions: 0,
                completed_questions: 0,
                completion_percentage: 0,
            });
        }

        let subject = subject_key(r.subject.as_deref());
        if !subject.is_empty()
            && !catalog
                .subjects
                .iter()
                .any(|s| s.test_name == r.test_name && subject_matches(Some(s.name.as_str()), Some(subject.as_str())))
        {
            catalog.subjects.push(SubjectSummary {
                test_name: r.test_name.clone(),
                name: subject.clone(),
                display_name: None,
                total_questions: 0,
                completed_questions: 0,
                completion_percentage: 0,
            });
        }

        if !catalog.series.iter().any(|s| {
            s.test_name == r.test_name
                && s.series_no == r.series_no
                && subject_matches(s.subject.as_deref(), r.subject.as_deref())
        }) {
            catalog.series.push(SeriesSummary {
                test_name: r.test_name.clone(),
                subject: r.subject.clone(),
                series_no: r.series_no.clone(),
                display_name: r.display_name.clone(),
                total_questions: 0,
                completed_questions: 0,
                completion_percentage: 0,
                score: None,
            });
        }
    }
}

/// Re-derives every summary's total from the file refs
///
/// Totals here are index-declared counts; the progress aggregator later
/// replaces them with actual loaded counts where files are loadable.
pub fn rebuild_totals(catalog: &mut CatalogIndex) {
    for series in &mut catalog.series {
        series.total_questions = catalog
            .question_files
            .iter()
            .filter(|r| {
                r.test_name == series.test_name
                    && r.series_no == series.series_no
                    && subject_matches(r.subject.as_deref(), series.subject.as_deref())
            })
            .map(|r| r.count)
            .sum();
    }

    for subject in &mut catalog.subjects {
        subject.total_questions = catalog
            .question_files
            .iter()
            .filter(|r| {
                r.test_name == subject.test_name
                    && subject_matches(r.subject.as_deref(), Some(subject.name.as_str()))
            })
            .map(|r| r.count)
            .sum();
    }

    for test in &mut catalog.test_names {
        test.total_questions = catalog
            .question_files
            .iter()
            .filter(|r| r.test_name == test.name)
            .map(|r| r.count)
            .sum();
    }
}
