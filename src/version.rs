/// Version migrator module
///
/// Two independent version axes are persisted: the content dataset
/// version (which index and files are active) and the schema/data version
/// (whether persisted answers are compatible with the current
/// ID-derivation rules). Drift on either axis makes stored question ids
/// meaningless, so the stale answer and progress state is wiped. Imported
/// user content and loader configuration are never touched.
use crate::errors::DataError;
use crate::store::{KvStore, keys};
use tracing::{info, instrument};

/// Compatibility version of the ID-derivation rules. Bump only when the
/// way question ids are derived changes.
pub const DATA_SCHEMA_VERSION: &str = "2";

/// What the startup migration found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No versions were stored yet; they are now
    FirstRun,
    /// Stored versions match the active ones
    Unchanged,
    /// A version drifted; answers and progress were wiped
    Invalidated { reason: String },
}

/// Reconciles persisted versions with the active ones at startup
///
/// On mismatch of either axis, deletes `user_answers` and
/// `series_progress`, then stores the active versions. Not user-visible:
/// the wipe is logged, never surfaced as an error.
#[instrument(skip(kv))]
pub async fn ensure_versions(kv: &KvStore, dataset_version: &str) -> Result<MigrationOutcome, DataError> {
    let stored_dataset: Option<String> = kv.get(keys::DATASET_VERSION)?;
    let stored_schema: Option<String> = kv.get(keys::DATA_SCHEMA_VERSION)?;

    let outcome = match (&stored_dataset, &stored_schema) {
        (None, None) => MigrationOutcome::FirstRun,
        _ => {
            let mut reasons = Vec::new();
            if let Some(stored) = &stored_dataset {
                if stored != dataset_version {
                    reasons.push(format!("dataset {} -> {}", stored, dataset_version));
                }
            }
            if let Some(stored) = &stored_schema {
                if stored != DATA_SCHEMA_VERSION {
                    reasons.push(format!("schema {} -> {}", stored, DATA_SCHEMA_VERSION));
                }
            }

            if reasons.is_empty() {
                MigrationOutcome::Unchanged
            } else {
                MigrationOutcome::Invalidated {
                    reason: reasons.join(", "),
                }
            }
        }
    };

    if let MigrationOutcome::Invalidated { reason } = &outcome {
        info!("Version drift ({}); wiping answers and progress", reason);
        kv.delete(keys::USER_ANSWERS).await?;
        kv.delete(keys::SERIES_PROGRESS).await?;
    }

    kv.put(keys::DATASET_VERSION, &dataset_version).await?;
    kv.put(keys::DATA_SCHEMA_VERSION, &DATA_SCHEMA_VERSION).await?;

    Ok(outcome)
}
