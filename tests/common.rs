/// Common test utilities for quizbank integration tests
///
/// Builds a complete on-disk world: a bundled data directory holding an
/// index plus question files, and a SQLite store, both in temp
/// directories. Opening the same world twice simulates an app restart
/// over the same local storage.
use quizbank::App;
use quizbank::config::Config;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub struct TestWorld {
    pub config: Config,
    data_dir: TempDir,
    _db_dir: TempDir,
}

impl TestWorld {
    /// A world bundling the two-generation sample dataset
    pub fn new() -> Self {
        Self::with_files(vec![
            ("v1/index.json", sample_index()),
            ("v1/questions/T1/S1/001.json", sample_file()),
        ])
    }

    /// A world bundling arbitrary (relative path, document) pairs
    pub fn with_files(files: Vec<(&str, Value)>) -> Self {
        let data_dir = TempDir::new().expect("Failed to create data dir");
        let db_dir = TempDir::new().expect("Failed to create db dir");

        for (path, doc) in files {
            write_json(&data_dir.path().join(path), &doc);
        }

        let config = Config {
            database_url: db_dir.path().join("test.db").to_string_lossy().to_string(),
            data_dir: Some(data_dir.path().to_path_buf()),
            remote_base_url: None,
            dataset_version: "v1".to_string(),
        };

        Self {
            config,
            data_dir,
            _db_dir: db_dir,
        }
    }

    /// Opens (or re-opens) the app over this world's storage
    pub async fn open(&self) -> App {
        App::open(self.config.clone())
            .await
            .expect("Failed to open app")
    }

    /// Adds or replaces a bundled file, as a dataset update would
    pub fn write_bundled_file(&self, path: &str, doc: &Value) {
        write_json(&self.data_dir.path().join(path), doc);
    }

    /// Deletes the whole bundled data directory, simulating a start with
    /// no backend able to produce anything
    pub fn remove_bundled_data(&self) {
        fs::remove_dir_all(self.data_dir.path().join("v1")).expect("Failed to remove data");
    }
}

fn write_json(path: &Path, doc: &Value) {
    fs::create_dir_all(path.parent().expect("File paths have parents"))
        .expect("Failed to create parent dirs");
    fs::write(path, serde_json::to_string_pretty(doc).expect("Serializable document"))
        .expect("Failed to write file");
}

/// The sample index: one test, one subject, one series of two questions
pub fn sample_index() -> Value {
    json!({
        "metadata": {"version": "v1", "lastUpdated": "2025-07-01"},
        "testNames": ["T1"],
        "subjects": [{"testName": "T1", "subject": "S1"}],
        "series": [{"testName": "T1", "subject": "S1", "series_no": "001"}],
        "questionFiles": [
            {
                "testName": "T1",
                "subject": "S1",
                "series_no": "001",
                "file": "questions/T1/S1/001.json",
                "count": 2
            }
        ]
    })
}

/// Two records spanning both question-record generations
pub fn sample_file() -> Value {
    json!([
        {
            "id": "1",
            "content": "Q1",
            "A": "a", "B": "b", "C": "c", "D": "d",
            "correctAnswer": "B",
            "exp": "because"
        },
        {
            "Id": "2",
            "Q": "Q2",
            "A": "x", "B": "y",
            "Ans": "2",
            "Exp": "why"
        }
    ])
}

/// A simple import payload with `count` single-choice questions
pub fn import_payload(count: u32) -> Value {
    let questions: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "content": format!("Imported question {}", i),
                "A": "a", "B": "b", "C": "c", "D": "d",
                "correctAnswer": "A"
            })
        })
        .collect();
    json!({"questions": questions})
}
