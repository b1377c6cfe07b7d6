/// Quizbank: an offline question-bank data layer
///
/// This library is the local data layer of a question-bank study app: it
/// turns a versioned index document plus many per-file question documents
/// (in several incompatible legacy shapes) into one normalized in-memory
/// catalog, lazily loads and caches per-file question sets, persists
/// per-question answer/favorite state, aggregates progress statistics
/// across the TestName → Subject → Series hierarchy, and merges
/// runtime-imported content without corrupting the bundled dataset.
///
/// ### Modules
///
/// - `config`: layered configuration (defaults, config file, CLI/env)
/// - `db` / `schema` / `store`: the SQLite-backed key-value store
/// - `models`: normalized questions, answer state, catalog summaries
/// - `normalize`: legacy-shape question records -> canonical questions
/// - `loader`: named-resource fetching through an ordered backend list
/// - `cache`: memoized, single-flight question-file loading
/// - `answers`: persistent answer/favorite state with its invariant
/// - `catalog`: index-document loading and summary building
/// - `version`: dataset/schema version drift detection
/// - `import`: runtime imports into a separate namespace
/// - `progress`: bottom-up completion/score aggregation
///
/// Everything hangs off one [`App`] handle constructed at startup and
/// passed explicitly — there are no hidden globals.

/// Configuration module
pub mod config;

/// Database connection module
pub mod db;

/// Database schema module
pub mod schema;

/// Key-value store module
pub mod store;

/// Data models module
pub mod models;

/// Raw external document shapes
pub mod dto;

/// Error taxonomy
pub mod errors;

/// Schema normalizer
pub mod normalize;

/// Resource loader and backends
pub mod loader;

/// Question file cache
pub mod cache;

/// Answer store
pub mod answers;

/// Catalog index loading
pub mod catalog;

/// Version migration
pub mod version;

/// Import merger
pub mod import;

/// Progress aggregation
pub mod progress;

#[cfg(test)]
pub mod test_utils;

use crate::answers::AnswerStore;
use crate::cache::QuestionFileCache;
use crate::config::Config;
use crate::errors::DataError;
use crate::import::{ImportRequest, ImportedFileEntry};
use crate::loader::{PersistedBackend, RemoteBackend, ResourceBackend, ResourceLoader, StaticBackend};
use crate::models::{CatalogIndex, Question, QuestionFileRef};
use crate::store::KvStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The one handle everything flows through
///
/// Constructed once at startup; the cache and answer store are
/// process-wide singletons by virtue of living here, and every mutation
/// goes through their narrow APIs.
pub struct App {
    config: Config,
    kv: KvStore,
    loader: Arc<ResourceLoader>,
    cache: QuestionFileCache,
    answers: AnswerStore,
    catalog: RwLock<CatalogIndex>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").finish_non_exhaustive()
    }
}

impl App {
    /// Opens the data layer: pool, migrations, version reconciliation,
    /// catalog load (with snapshot fallback), imported-content merge, and
    /// the progress mirror.
    ///
    /// ### Errors
    ///
    /// Fails only when the key-value store is unusable or when neither
    /// any backend nor the snapshot can produce a catalog.
    pub async fn open(config: Config) -> Result<Self, DataError> {
        let pool = Arc::new(db::init_pool(&config.database_url));
        {
            let conn = &mut pool
                .get()
                .map_err(|e| DataError::Storage(anyhow::Error::new(e)))?;
            run_migrations(conn);
        }
        let kv = KvStore::new(pool);

        let outcome = version::ensure_versions(&kv, &config.dataset_version).await?;
        info!("Version check: {:?}", outcome);

        let loader = Arc::new(ResourceLoader::new(
            config.dataset_version.clone(),
            Self::build_backends(&config, &kv),
            kv.clone(),
        ));

        let mut catalog_index = catalog::load_catalog(&loader, &kv).await?;

        let imported = import::load_imported_index(&kv)?;
        let merged = import::merge_imported_index(&mut catalog_index, &imported);
        if merged > 0 {
            info!("Merged {} imported files into the catalog", merged);
        }

        // Mirror the last recompute so summary reads are O(1) from the start
        if let Some(report) = progress::load_report(&kv)? {
            progress::apply_report(&mut catalog_index, &report);
        }

        Ok(Self {
            cache: QuestionFileCache::new(loader.clone()),
            answers: AnswerStore::open(kv.clone()),
            config,
            kv,
            loader,
            catalog: RwLock::new(catalog_index),
        })
    }

    /// The backend list, in fixed priority: static registry, remote
    /// fetch, persisted fallback
    fn build_backends(config: &Config, kv: &KvStore) -> Vec<Box<dyn ResourceBackend>> {
        let mut backends: Vec<Box<dyn ResourceBackend>> = Vec::new();

        if let Some(data_dir) = &config.data_dir {
            match StaticBackend::from_dir(data_dir) {
                Ok(backend) => backends.push(Box::new(backend)),
                Err(e) => warn!("Bundled data directory unusable: {}", e),
            }
        }
        if let Some(base_url) = &config.remote_base_url {
            backends.push(Box::new(RemoteBackend::new(base_url)));
        }
        backends.push(Box::new(PersistedBackend::new(kv.clone())));

        backends
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn kv(&self) -> &KvStore {
        &self.kv
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn cache(&self) -> &QuestionFileCache {
        &self.cache
    }

    /// A snapshot of the current catalog
    pub async fn catalog(&self) -> CatalogIndex {
        self.catalog.read().await.clone()
    }

    /// Reloads the catalog from the backends (explicit refresh), keeping
    /// imported content and the progress mirror applied
    pub async fn reload_catalog(&self) -> Result<(), DataError> {
        let mut rebuilt = catalog::load_catalog(&self.loader, &self.kv).await?;
        import::merge_imported_index(&mut rebuilt, &import::load_imported_index(&self.kv)?);
        if let Some(report) = progress::load_report(&self.kv)? {
            progress::apply_report(&mut rebuilt, &report);
        }
        *self.catalog.write().await = rebuilt;
        Ok(())
    }

    /// The questions of one series
    pub async fn questions_for(
        &self,
        test_name: &str,
        subject: Option<&str>,
        series_no: &str,
    ) -> Result<Arc<Vec<Question>>, DataError> {
        let file_ref = self.file_ref_for(test_name, subject, series_no).await?;
        self.cache.load(&file_ref).await
    }

    /// Imports an already-parsed question document and exposes it in the
    /// live catalog
    pub async fn import_questions(
        &self,
        raw_doc: &serde_json::Value,
        request: &ImportRequest,
    ) -> Result<ImportedFileEntry, DataError> {
        let entry = import::import_questions(&self.kv, raw_doc, request).await?;

        let imported = import::load_imported_index(&self.kv)?;
        let mut catalog_index = self.catalog.write().await;
        import::merge_imported_index(&mut catalog_index, &imported);

        Ok(entry)
    }

    /// Recomputes all progress statistics and mirrors them into the
    /// catalog
    pub async fn recompute_progress(&self) -> Result<progress::ProgressReport, DataError> {
        let mut catalog_index = self.catalog.write().await;
        progress::recompute(&mut catalog_index, &self.cache, &self.answers, &self.kv).await
    }

    /// Restarts one series: answer-session state resets, favorites and
    /// wrong-book membership survive
    pub async fn clear_series_answers(
        &self,
        test_name: &str,
        subject: Option<&str>,
        series_no: &str,
    ) -> Result<usize, DataError> {
        let file_ref = self.file_ref_for(test_name, subject, series_no).await?;
        self.clear_file_answers(&file_ref).await
    }

    /// Clears answer-session state for every question in one file
    pub async fn clear_file_answers(&self, file_ref: &QuestionFileRef) -> Result<usize, DataError> {
        let questions = self.cache.load(file_ref).await?;
        let ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        self.answers.clear_answers(ids).await
    }

    /// Clears answer-session state for the whole wrong book, keeping its
    /// membership
    pub async fn clear_wrong_book_answers(&self) -> Result<usize, DataError> {
        self.answers.clear_wrong_book_answers().await
    }

    async fn file_ref_for(
        &self,
        test_name: &str,
        subject: Option<&str>,
        series_no: &str,
    ) -> Result<QuestionFileRef, DataError> {
        let catalog_index = self.catalog.read().await;
        catalog_index
            .get_file_ref(test_name, subject, series_no)
            .cloned()
            .ok_or_else(|| DataError::MissingResource {
                name: format!("{}/{:?}/{}", test_name, subject, series_no),
                attempted: vec!["catalog file refs".to_string()],
            })
    }
}

/// Runs the embedded migrations
///
/// ### Panics
///
/// Panics if the migrations fail to run; the store is unusable then and
/// nothing downstream could work.
pub fn run_migrations(conn: &mut diesel::SqliteConnection) {
    use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
}
