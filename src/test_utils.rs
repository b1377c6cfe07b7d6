use crate::db::{self, DbPool};
use crate::store::KvStore;
use std::sync::Arc;

/// Sets up a test database with migrations applied
///
/// Uses a unique shared in-memory database for each test. Plain
/// ":memory:" gives each connection its own separate database, so
/// migrations run on one connection wouldn't be visible on others. A
/// unique URI with cache=shared makes all connections in this pool share
/// one in-memory database while staying isolated from other tests.
pub fn setup_test_pool() -> Arc<DbPool> {
    let unique_id = uuid::Uuid::new_v4();
    let database_url = format!("file:test_{}?mode=memory&cache=shared", unique_id);
    let pool = Arc::new(db::init_pool(&database_url));

    let conn = &mut pool.get().expect("Failed to get connection");
    crate::run_migrations(conn);

    pool
}

/// A KvStore over a fresh in-memory database
pub fn setup_kv() -> KvStore {
    KvStore::new(setup_test_pool())
}

/// A minimal raw single-choice record in the legacy field generation
pub fn legacy_record(prompt: &str, answer: &str) -> serde_json::Value {
    serde_json::json!({
        "Q": prompt,
        "A": "option a",
        "B": "option b",
        "C": "option c",
        "D": "option d",
        "Ans": answer,
        "Exp": "because"
    })
}

/// A question-file document in the legacy metadata-wrapped generation
pub fn legacy_file_doc(test_name: &str, subject: Option<&str>, series_no: &str, records: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "testName": test_name,
            "subject": subject,
            "series_no": series_no,
        },
        "questions": records,
    })
}
