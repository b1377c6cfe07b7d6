/// Question file cache module
///
/// Per-file question sets are loaded lazily, normalized once, and held
/// for the process lifetime — the dataset is small and read-only, so
/// there is no eviction. Concurrent requests for the same file
/// single-flight: every caller awaits the one underlying fetch instead of
/// issuing duplicates.
use crate::dto::QuestionFileDocument;
use crate::errors::DataError;
use crate::loader::ResourceLoader;
use crate::models::{Question, QuestionFileRef};
use crate::normalize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

type CacheSlot = Arc<OnceCell<Arc<Vec<Question>>>>;

/// Lazily loads and memoizes per-file question sets
pub struct QuestionFileCache {
    loader: Arc<ResourceLoader>,
    entries: Mutex<HashMap<String, CacheSlot>>,
}

impl QuestionFileCache {
    pub fn new(loader: Arc<ResourceLoader>) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the questions behind a file ref, memoized by file path
    ///
    /// The first caller for a path performs the fetch; callers arriving
    /// while it is in flight await the same result. A failed load leaves
    /// the slot empty so a later caller may retry; a discarded caller's
    /// load still completes and populates the cache.
    ///
    /// ### Errors
    ///
    /// Propagates `MissingResource` from the loader and
    /// `MalformedDocument` when the file parses but has no usable shape
    #[instrument(skip(self, file_ref), fields(file_path = %file_ref.file_path))]
    pub async fn load(&self, file_ref: &QuestionFileRef) -> Result<Arc<Vec<Question>>, DataError> {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries.entry(file_ref.file_path.clone()).or_default().clone()
        };

        slot.get_or_try_init(|| self.load_file(file_ref))
            .await
            .cloned()
    }

    /// Whether a file is already resident (test and inspection hook)
    pub async fn is_loaded(&self, file_path: &str) -> bool {
        let entries = self.entries.lock().await;
        entries.get(file_path).is_some_and(|slot| slot.get().is_some())
    }

    async fn load_file(&self, file_ref: &QuestionFileRef) -> Result<Arc<Vec<Question>>, DataError> {
        let doc = self.loader.fetch(&file_ref.file_path).await?;

        let parsed: QuestionFileDocument = serde_json::from_value(doc).map_err(|e| {
            DataError::malformed(&file_ref.file_path, format!("not a question file: {}", e))
        })?;
        let (metadata, records) = parsed.into_parts();

        // File-level metadata wins; the ref fills whatever is missing
        // (the simplified generation carries none).
        let metadata = metadata.unwrap_or_default();
        let test_name = metadata.test_name.as_deref().unwrap_or(&file_ref.test_name);
        let subject = metadata
            .subject
            .as_deref()
            .or(file_ref.subject.as_deref());
        let series_no = metadata.series_no.as_deref().unwrap_or(&file_ref.series_no);

        let mut questions = Vec::with_capacity(records.len());
        for (index, raw) in records.iter().enumerate() {
            let ordinal = (index + 1) as u32;
            if !raw.is_object() {
                // Skip the record, keep the file; ordinals stay positional.
                warn!(
                    file_path = %file_ref.file_path,
                    ordinal,
                    "Skipping non-object question record"
                );
                continue;
            }
            questions.push(normalize::normalize(raw, ordinal, test_name, subject, series_no));
        }

        if questions.len() as u32 != file_ref.count {
            debug!(
                file_path = %file_ref.file_path,
                expected = file_ref.count,
                actual = questions.len(),
                "Question count differs from the index entry"
            );
        }

        info!(
            file_path = %file_ref.file_path,
            count = questions.len(),
            "Loaded question file"
        );
        Ok(Arc::new(questions))
    }
}
