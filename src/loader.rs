/// Resource loader module
///
/// Every JSON document the data layer consumes (the index, each question
/// file) is fetched by name through one capability interface, tried
/// against an ordered list of backends: the compiled-in static registry,
/// the optional remote host, and the persisted fallback copies in the
/// key-value store. A backend failure is recoverable and falls through to
/// the next; only exhausting the whole list is an error, and that error
/// carries every path that was attempted.
use crate::errors::DataError;
use crate::store::{KvStore, keys};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Synthetic-path namespace for imported content; nothing bundled ever
/// lives under it
pub const IMPORTED_PATH_PREFIX: &str = "imported/";

/// One way of producing a named JSON resource
///
/// `fetch` returns `Ok(None)` when the backend simply does not have the
/// resource and `Err` when it tried and failed; the loader treats both as
/// fallthrough.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// How this backend would describe an attempt at `path`, for the
    /// MissingResource report
    fn describe(&self, path: &str) -> String;

    async fn fetch(&self, path: &str) -> anyhow::Result<Option<Value>>;

    /// Whether a successful fetch should be persisted as a fallback copy
    /// so the resource stays available offline
    fn wants_fallback_copy(&self) -> bool {
        false
    }
}

/// Compiled-in registry: exact path -> document
///
/// The bundled dataset ships as files; `from_dir` snapshots a data
/// directory into the registry at startup so lookups stay exact-path,
/// in-memory, and infallible.
pub struct StaticBackend {
    entries: HashMap<String, Value>,
}

impl StaticBackend {
    pub fn new(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }

    /// Loads every `.json` file under `root`, keyed by its relative path
    pub fn from_dir(root: &Path) -> anyhow::Result<Self> {
        let mut entries = HashMap::new();
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let relative = path
                    .strip_prefix(root)
                    .expect("walkdir yields paths under its root")
                    .to_string_lossy()
                    .replace('\\', "/");
                let text = std::fs::read_to_string(path)?;
                match serde_json::from_str(&text) {
                    Ok(doc) => {
                        entries.insert(relative, doc);
                    }
                    Err(e) => {
                        // One unreadable bundled file must not block the rest.
                        warn!("Skipping unparsable bundled file {:?}: {}", path, e);
                    }
                }
            }
        }
        info!("Loaded {} bundled resources from {:?}", entries.len(), root);
        Ok(Self { entries })
    }
}

#[async_trait]
impl ResourceBackend for StaticBackend {
    fn describe(&self, path: &str) -> String {
        format!("static:{}", path)
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.get(path).cloned())
    }
}

/// Remote host serving the dataset tree over HTTP
///
/// No timeout is configured here: bundled-resource loads are not on a
/// deadline, and the transport used for remote imports is a separate
/// collaborator outside this crate.
pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ResourceBackend for RemoteBackend {
    fn describe(&self, path: &str) -> String {
        self.url_for(path)
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<Option<Value>> {
        let url = self.url_for(path);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let doc = response.json::<Value>().await?;
        Ok(Some(doc))
    }

    fn wants_fallback_copy(&self) -> bool {
        true
    }
}

/// Previously persisted copies in the key-value store
///
/// Serves two namespaces: fallback copies written after successful remote
/// fetches, and imported content under its synthetic `imported/` paths.
pub struct PersistedBackend {
    kv: KvStore,
}

impl PersistedBackend {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    fn key_for(path: &str) -> String {
        if path.starts_with(IMPORTED_PATH_PREFIX) {
            format!("{}{}", keys::IMPORTED_RESOURCE_PREFIX, path)
        } else {
            format!("{}{}", keys::FALLBACK_RESOURCE_PREFIX, path)
        }
    }
}

#[async_trait]
impl ResourceBackend for PersistedBackend {
    fn describe(&self, path: &str) -> String {
        format!("kv:{}", Self::key_for(path))
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<Option<Value>> {
        self.kv.get::<Value>(&Self::key_for(path))
    }
}

/// Fetches named JSON resources for the active dataset version
pub struct ResourceLoader {
    dataset_version: String,
    backends: Vec<Box<dyn ResourceBackend>>,
    kv: KvStore,
}

impl ResourceLoader {
    pub fn new(dataset_version: impl Into<String>, backends: Vec<Box<dyn ResourceBackend>>, kv: KvStore) -> Self {
        Self {
            dataset_version: dataset_version.into(),
            backends,
            kv,
        }
    }

    pub fn dataset_version(&self) -> &str {
        &self.dataset_version
    }

    /// Resolves a resource name to its full path
    ///
    /// Bundled names live under the active dataset version; imported
    /// synthetic paths are version-independent and pass through as-is.
    pub fn resolve(&self, name: &str) -> String {
        if name.starts_with(IMPORTED_PATH_PREFIX) {
            name.to_string()
        } else {
            format!("{}/{}", self.dataset_version, name)
        }
    }

    /// Fetches a named resource through the backend list
    ///
    /// ### Errors
    ///
    /// `DataError::MissingResource` when every backend came up empty,
    /// carrying the attempted paths. No implicit retries — callers decide
    /// whether to retry or degrade.
    #[instrument(skip(self))]
    pub async fn fetch(&self, name: &str) -> Result<Value, DataError> {
        let path = self.resolve(name);
        let mut attempted = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            let description = backend.describe(&path);
            match backend.fetch(&path).await {
                Ok(Some(doc)) => {
                    debug!("Resolved `{}` via {}", path, description);
                    if backend.wants_fallback_copy() {
                        self.persist_fallback_copy(&path, &doc).await;
                    }
                    return Ok(doc);
                }
                Ok(None) => {
                    debug!("`{}` not present at {}", path, description);
                }
                Err(e) => {
                    warn!("Backend {} failed for `{}`: {}", description, path, e);
                }
            }
            attempted.push(description);
        }

        Err(DataError::MissingResource { name: path, attempted })
    }

    /// Keeps a remote hit available for later offline runs. Failure here
    /// only costs the copy, never the fetch that succeeded.
    async fn persist_fallback_copy(&self, path: &str, doc: &Value) {
        let key = format!("{}{}", keys::FALLBACK_RESOURCE_PREFIX, path);
        if let Err(e) = self.kv.put(&key, doc).await {
            warn!("Could not persist fallback copy of `{}`: {}", path, e);
        }
    }
}
