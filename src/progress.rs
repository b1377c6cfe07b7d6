/// Progress aggregator module
///
/// Recomputes completion and score statistics bottom-up: each series
/// joins its question file with the answer store, subjects and test names
/// aggregate the union of their descendants' question-id sets (several
/// files can map into one subject, so a naive sum would double count).
/// The result is persisted and mirrored into the in-memory catalog, so
/// reads between recomputes are O(1).
use crate::answers::AnswerStore;
use crate::cache::QuestionFileCache;
use crate::errors::DataError;
use crate::models::{CatalogIndex, UserAnswer, subject_key};
use crate::store::{KvStore, keys};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Stats for one series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeriesProgress {
    pub total: u32,
    pub answered: u32,
    pub correct: u32,
    pub completion_percentage: u32,
    /// Frozen at the moment the series was last fully answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// Stats for one subject or test name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupProgress {
    pub total: u32,
    pub answered: u32,
    pub completion_percentage: u32,
}

/// The persisted output of one recompute pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub series: HashMap<String, SeriesProgress>,
    pub subjects: HashMap<String, GroupProgress>,
    pub test_names: HashMap<String, GroupProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_at: Option<DateTime<Utc>>,
}

/// Storage key for one series' stats
pub fn series_progress_key(test_name: &str, subject: Option<&str>, series_no: &str) -> String {
    format!("{}::{}::{}", test_name, subject_key(subject), series_no)
}

/// Storage key for one (testName, subject) group
fn subject_progress_key(test_name: &str, subject: &str) -> String {
    format!("{}::{}", test_name, subject_key(Some(subject)))
}

fn percent(part: u32, total: u32) -> u32 {
    if total == 0 {
        0
    } else {
        ((f64::from(part) / f64::from(total)) * 100.0).round() as u32
    }
}

#[derive(Default)]
struct GroupAcc {
    ids: HashSet<String>,
    /// Declared counts of series whose files could not be loaded; their
    /// ids are unknown but their questions still exist
    unloaded_total: u32,
}

impl GroupAcc {
    fn into_progress(self, answers: &HashMap<String, UserAnswer>) -> GroupProgress {
        let total = self.ids.len() as u32 + self.unloaded_total;
        let answered = self
            .ids
            .iter()
            .filter(|id| answers.get(*id).is_some_and(|a| a.is_answered))
            .count() as u32;
        GroupProgress {
            total,
            answered,
            completion_percentage: percent(answered, total),
        }
    }
}

/// Recomputes every summary and mirrors the result into the catalog
///
/// A series whose file cannot be loaded degrades to zero stats (its
/// frozen score survives); nothing short of a storage failure aborts the
/// pass.
#[instrument(skip_all)]
pub async fn recompute(
    catalog_index: &mut CatalogIndex,
    cache: &QuestionFileCache,
    answers: &AnswerStore,
    kv: &KvStore,
) -> Result<ProgressReport, DataError> {
    let previous: ProgressReport = kv
        .get(keys::SERIES_PROGRESS)
        .unwrap_or_else(|e| {
            warn!("Persisted progress unreadable, recomputing from scratch: {}", e);
            None
        })
        .unwrap_or_default();
    let answer_map = answers.all().await;

    let mut report = ProgressReport {
        computed_at: Some(Utc::now()),
        ..Default::default()
    };
    let mut subject_accs: HashMap<String, GroupAcc> = HashMap::new();
    let mut test_accs: HashMap<String, GroupAcc> = HashMap::new();

    let series_rows: Vec<(String, Option<String>, String)> = catalog_index
        .series
        .iter()
        .map(|s| (s.test_name.clone(), s.subject.clone(), s.series_no.clone()))
        .collect();

    for (test_name, subject, series_no) in series_rows {
        let key = series_progress_key(&test_name, subject.as_deref(), &series_no);
        let frozen = previous.series.get(&key).and_then(|p| p.score);

        let test_acc = test_accs.entry(test_name.clone()).or_default();
        let subject_acc = match subject_key(subject.as_deref()).as_str() {
            "" => None,
            s => Some(
                subject_accs
                    .entry(subject_progress_key(&test_name, s))
                    .or_default(),
            ),
        };

        let Some(file_ref) = catalog_index.get_file_ref(&test_name, subject.as_deref(), &series_no)
        else {
            warn!(
                "Series {}/{:?}/{} has no file ref; zero stats",
                test_name, subject, series_no
            );
            report.series.insert(
                key,
                SeriesProgress {
                    score: frozen,
                    ..Default::default()
                },
            );
            continue;
        };

        let progress = match cache.load(file_ref).await {
            Ok(questions) => {
                let total = questions.len() as u32;
                let answered = questions
                    .iter()
                    .filter(|q| answer_map.get(&q.id).is_some_and(|a| a.is_answered))
                    .count() as u32;
                let correct = questions
                    .iter()
                    .filter(|q| {
                        answer_map
                            .get(&q.id)
                            .is_some_and(|a| a.is_answered && a.is_correct)
                    })
                    .count() as u32;

                // The score freezes only on a full pass; an incomplete
                // series keeps whatever was frozen before.
                let score = if total > 0 && answered == total {
                    Some(percent(correct, total))
                } else {
                    frozen
                };

                test_acc.ids.extend(questions.iter().map(|q| q.id.clone()));
                if let Some(acc) = subject_acc {
                    acc.ids.extend(questions.iter().map(|q| q.id.clone()));
                }

                SeriesProgress {
                    total,
                    answered,
                    correct,
                    completion_percentage: percent(answered, total),
                    score,
                }
            }
            Err(e) => {
                warn!(
                    "Could not load {} for progress ({}); zero stats",
                    file_ref.file_path, e
                );
                test_acc.unloaded_total += file_ref.count;
                if let Some(acc) = subject_acc {
                    acc.unloaded_total += file_ref.count;
                }
                SeriesProgress {
                    total: file_ref.count,
                    score: frozen,
                    ..Default::default()
                }
            }
        };

        report.series.insert(key, progress);
    }

    report.subjects = subject_accs
        .into_iter()
        .map(|(key, acc)| (key, acc.into_progress(&answer_map)))
        .collect();
    report.test_names = test_accs
        .into_iter()
        .map(|(key, acc)| (key, acc.into_progress(&answer_map)))
        .collect();

    kv.put(keys::SERIES_PROGRESS, &report).await?;
    apply_report(catalog_index, &report);

    info!(
        "Progress recomputed over {} series, {} answers",
        report.series.len(),
        answer_map.len()
    );
    Ok(report)
}

/// Mirrors a progress report into catalog summaries
///
/// Used right after a recompute and at startup, so summaries reflect the
/// last recompute without touching any question file.
pub fn apply_report(catalog_index: &mut CatalogIndex, report: &ProgressReport) {
    for series in &mut catalog_index.series {
        let key = series_progress_key(&series.test_name, series.subject.as_deref(), &series.series_no);
        if let Some(p) = report.series.get(&key) {
            if p.total > 0 {
                series.total_questions = p.total;
            }
            series.completed_questions = p.answered;
            series.completion_percentage = p.completion_percentage;
            series.score = p.score;
        }
    }

    for subject in &mut catalog_index.subjects {
        let key = subject_progress_key(&subject.test_name, &subject.name);
        if let Some(p) = report.subjects.get(&key) {
            if p.total > 0 {
                subject.total_questions = p.total;
            }
            subject.completed_questions = p.answered;
            subject.completion_percentage = p.completion_percentage;
        }
    }

    for test in &mut catalog_index.test_names {
        if let Some(p) = report.test_names.get(&test.name) {
            if p.total > 0 {
                test.total_questions = p.total;
            }
            test.completed_questions = p.answered;
            test.completion_percentage = p.completion_percentage;
        }
    }
}

/// Reads the last persisted report, if any
pub fn load_report(kv: &KvStore) -> Result<Option<ProgressReport>, DataError> {
    Ok(kv.get(keys::SERIES_PROGRESS)?)
}
