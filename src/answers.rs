/// Answer store module
///
/// Persistent per-question answer state. The whole map lives under one
/// key-value entry and is rewritten on every mutation, which keeps a
/// single caller's read-after-write consistent: each write fully persists
/// before its call returns. All mutation flows through this narrow API so
/// the favorite⇔wrong-book invariant is enforced centrally, never by
/// convention at call sites.
use crate::errors::DataError;
use crate::models::{AnswerPatch, UserAnswer};
use crate::store::{KvStore, keys};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Process-wide store of questionId -> UserAnswer
pub struct AnswerStore {
    kv: KvStore,
    answers: Mutex<HashMap<String, UserAnswer>>,
}

impl AnswerStore {
    /// Opens the store, loading whatever was persisted
    ///
    /// A corrupt persisted map is logged and replaced by an empty one —
    /// answer state is valuable but never worth failing startup over.
    pub fn open(kv: KvStore) -> Self {
        let answers = match kv.get::<HashMap<String, UserAnswer>>(keys::USER_ANSWERS) {
            Ok(Some(map)) => map,
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Persisted answers unreadable, starting empty: {}", e);
                HashMap::new()
            }
        };
        info!("Answer store opened with {} records", answers.len());
        Self {
            kv,
            answers: Mutex::new(answers),
        }
    }

    /// Returns the record for a question, if one exists
    pub async fn get(&self, question_id: &str) -> Option<UserAnswer> {
        self.answers.lock().await.get(question_id).cloned()
    }

    /// Snapshot of every record, for progress joins
    pub async fn all(&self) -> HashMap<String, UserAnswer> {
        self.answers.lock().await.clone()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.answers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.answers.lock().await.is_empty()
    }

    /// Applies a patch to a question's record, creating it on first
    /// interaction
    ///
    /// Whatever the patch said about `is_in_wrong_book` is overridden:
    /// after every write `is_in_wrong_book == is_favorite`.
    #[instrument(skip(self, patch))]
    pub async fn set(&self, question_id: &str, patch: AnswerPatch) -> Result<UserAnswer, DataError> {
        let mut answers = self.answers.lock().await;

        let current = answers
            .get(question_id)
            .cloned()
            .unwrap_or_else(|| UserAnswer::new(question_id));
        let updated = current.apply(patch);
        answers.insert(question_id.to_string(), updated.clone());

        self.kv.put(keys::USER_ANSWERS, &*answers).await?;
        debug!("Answer record for {} persisted", question_id);
        Ok(updated)
    }

    /// Flips favorite (and with it wrong-book membership)
    ///
    /// An absent record counts as not-favorite, so the first toggle
    /// favorites the question.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, question_id: &str) -> Result<UserAnswer, DataError> {
        let currently = self
            .get(question_id)
            .await
            .map(|a| a.is_favorite)
            .unwrap_or(false);

        self.set(
            question_id,
            AnswerPatch {
                is_favorite: Some(!currently),
                ..Default::default()
            },
        )
        .await
    }

    /// Removes a question from the wrong book (and favorites), also
    /// clearing its uncertainty mark
    #[instrument(skip(self))]
    pub async fn remove_from_wrong_book(&self, question_id: &str) -> Result<UserAnswer, DataError> {
        self.set(
            question_id,
            AnswerPatch {
                is_favorite: Some(false),
                is_in_wrong_book: Some(false),
                is_uncertain: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Records an answer attempt against the canonical correct answer
    ///
    /// A miss bumps the lifetime wrong count and files the question into
    /// the wrong book; a hit leaves favorite state alone.
    #[instrument(skip(self, selected, correct_answer))]
    pub async fn record_answer(
        &self,
        question_id: &str,
        selected: &str,
        correct_answer: &str,
    ) -> Result<UserAnswer, DataError> {
        let is_correct = answers_match(selected, correct_answer);
        let previous = self.get(question_id).await;

        let mut patch = AnswerPatch {
            is_answered: Some(true),
            is_correct: Some(is_correct),
            selected_answer: Some(Some(selected.trim().to_string())),
            ..Default::default()
        };
        if !is_correct {
            let wrong_count = previous.as_ref().map(|a| a.wrong_count).unwrap_or(0);
            patch.wrong_count = Some(wrong_count + 1);
            patch.is_favorite = Some(true);
        }

        self.set(question_id, patch).await
    }

    /// Resets answer-session state for a scoped id-set, preserving
    /// favorite/wrong-book membership and lifetime wrong counts
    ///
    /// Restarting a test must not un-favorite questions.
    #[instrument(skip(self, question_ids))]
    pub async fn clear_answers<I, S>(&self, question_ids: I) -> Result<usize, DataError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut answers = self.answers.lock().await;

        let mut cleared = 0;
        for id in question_ids {
            if let Some(record) = answers.get(id.as_ref()) {
                let cleared_record = record.clone().cleared();
                answers.insert(id.as_ref().to_string(), cleared_record);
                cleared += 1;
            }
        }

        if cleared > 0 {
            self.kv.put(keys::USER_ANSWERS, &*answers).await?;
        }
        info!("Cleared {} answer records", cleared);
        Ok(cleared)
    }

    /// Resets answer-session state for every wrong-book member, keeping
    /// them in the wrong book for another pass
    #[instrument(skip(self))]
    pub async fn clear_wrong_book_answers(&self) -> Result<usize, DataError> {
        let members: Vec<String> = {
            let answers = self.answers.lock().await;
            answers
                .values()
                .filter(|a| a.is_in_wrong_book)
                .map(|a| a.question_id.clone())
                .collect()
        };

        self.clear_answers(members).await
    }

    /// Current wrong-book members
    pub async fn wrong_book(&self) -> Vec<UserAnswer> {
        let answers = self.answers.lock().await;
        let mut members: Vec<UserAnswer> = answers
            .values()
            .filter(|a| a.is_in_wrong_book)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        members
    }

    /// Drops every record. Only the version migrator calls this, when a
    /// version change makes stored ids meaningless.
    #[instrument(skip(self))]
    pub async fn wipe(&self) -> Result<(), DataError> {
        let mut answers = self.answers.lock().await;
        answers.clear();
        self.kv.delete(keys::USER_ANSWERS).await?;
        info!("Answer store wiped");
        Ok(())
    }
}

/// Compares a selection against the canonical answer
///
/// Both sides are normalized the same way: uppercased, comma-split, and
/// order-insensitive, so "c,a" matches a canonical "A,C".
fn answers_match(selected: &str, correct: &str) -> bool {
    let normalize = |s: &str| {
        let mut letters: Vec<String> = s
            .split([',', '，'])
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        letters.sort();
        letters
    };
    normalize(selected) == normalize(correct)
}

#[cfg(test)]
mod tests;
