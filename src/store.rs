/// Key-value store module
///
/// Every persistent piece of state in the data layer (answers, versions,
/// progress, imported content, fallback resource copies) lives as one JSON
/// value under one key in a single SQLite table. Writes are upserts that
/// fully persist before returning, which is what gives a single caller
/// read-after-write consistency for the same key.
use crate::db::{self, DbPool};
use crate::schema::kv_entries;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Well-known storage keys and key prefixes
pub mod keys {
    /// Map of questionId -> UserAnswer, one entry for the whole map
    pub const USER_ANSWERS: &str = "user_answers";
    /// Active content dataset version
    pub const DATASET_VERSION: &str = "dataset_version";
    /// ID-derivation compatibility version
    pub const DATA_SCHEMA_VERSION: &str = "data_schema_version";
    /// Last successfully built index summary, for degraded startup
    pub const CATALOG_SNAPSHOT: &str = "catalog_snapshot";
    /// Per-series progress statistics, including frozen scores
    pub const SERIES_PROGRESS: &str = "series_progress";
    /// Imported QuestionFileRefs plus summary rows
    pub const IMPORTED_INDEX: &str = "imported_index";
    /// One imported question-file document per synthetic path
    pub const IMPORTED_RESOURCE_PREFIX: &str = "resource.imported.";
    /// Persisted fallback copy of a remotely fetched resource
    pub const FALLBACK_RESOURCE_PREFIX: &str = "resource.fallback.";
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = kv_entries)]
struct NewKvEntry {
    key: String,
    value: String,
    updated_at: NaiveDateTime,
}

/// Thin JSON wrapper over the kv_entries table
#[derive(Clone)]
pub struct KvStore {
    pool: Arc<DbPool>,
}

impl KvStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Reads and deserializes the value stored under `key`
    ///
    /// ### Returns
    ///
    /// `Ok(None)` if the key has never been written
    ///
    /// ### Errors
    ///
    /// Returns an error if the pool has no connection available, the
    /// query fails, or the stored text is not valid JSON for `T`
    #[instrument(skip(self))]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = &mut self.pool.get()?;

        let raw = kv_entries::table
            .find(key)
            .select(kv_entries::value)
            .first::<String>(conn)
            .optional()
            .with_context(|| format!("Failed to read key `{}`", key))?;

        match raw {
            Some(text) => {
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("Stored value under `{}` is not valid JSON", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serializes `value` and upserts it under `key`
    ///
    /// The write is fully durable when this returns: a read of the same
    /// key by the same caller observes the new value.
    #[instrument(skip(self, value))]
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = NewKvEntry {
            key: key.to_string(),
            value: serde_json::to_string(value)
                .with_context(|| format!("Failed to serialize value for `{}`", key))?,
            updated_at: Utc::now().naive_utc(),
        };

        db::execute_with_retry(&self.pool, move |conn| {
            diesel::insert_into(kv_entries::table)
                .values(entry.clone())
                .on_conflict(kv_entries::key)
                .do_update()
                .set((
                    kv_entries::value.eq(entry.value.clone()),
                    kv_entries::updated_at.eq(entry.updated_at),
                ))
                .execute(conn)
        })
        .await
        .with_context(|| format!("Failed to write key `{}`", key))?;

        debug!("Persisted key `{}`", key);
        Ok(())
    }

    /// Deletes the entry under `key`
    ///
    /// ### Returns
    ///
    /// `true` if an entry existed and was removed
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let key_owned = key.to_string();
        let rows = db::execute_with_retry(&self.pool, move |conn| {
            diesel::delete(kv_entries::table.find(key_owned.as_str())).execute(conn)
        })
        .await
        .with_context(|| format!("Failed to delete key `{}`", key))?;

        Ok(rows > 0)
    }

    /// Lists all keys starting with `prefix`, in key order
    #[instrument(skip(self))]
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = &mut self.pool.get()?;

        // LIKE treats % and _ as wildcards; the prefixes used by this
        // crate contain neither, but escape _ anyway since resource
        // paths may.
        let pattern = format!("{}%", prefix.replace('_', "\\_"));
        let found = kv_entries::table
            .filter(kv_entries::key.like(pattern).escape('\\'))
            .select(kv_entries::key)
            .order(kv_entries::key.asc())
            .load::<String>(conn)
            .with_context(|| format!("Failed to list keys under `{}`", prefix))?;

        Ok(found)
    }
}

#[cfg(test)]
mod tests;
