use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-question answer state
///
/// Favorite and wrong-book are one concept exposed under two names:
/// `is_in_wrong_book == is_favorite` always. The invariant is recomputed
/// on every write inside [`UserAnswer::apply`], which is the only write
/// path, so no caller can desynchronize the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    pub is_answered: bool,
    pub is_correct: bool,
    pub selected_answer: Option<String>,
    pub is_favorite: bool,
    pub is_in_wrong_book: bool,
    pub is_uncertain: bool,
    pub wrong_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Update structure for UserAnswer with all fields optional
///
/// `selected_answer` is doubly optional: `None` leaves the selection
/// alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct AnswerPatch {
    pub is_answered: Option<bool>,
    pub is_correct: Option<bool>,
    pub selected_answer: Option<Option<String>>,
    pub is_favorite: Option<bool>,
    pub is_in_wrong_book: Option<bool>,
    pub is_uncertain: Option<bool>,
    pub wrong_count: Option<u32>,
}

impl UserAnswer {
    /// Creates a blank record for a question's first interaction
    pub fn new(question_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            question_id: question_id.into(),
            is_answered: false,
            is_correct: false,
            selected_answer: None,
            is_favorite: false,
            is_in_wrong_book: false,
            is_uncertain: false,
            wrong_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch, re-enforcing the favorite⇔wrong-book invariant
    ///
    /// Whatever the patch carried for `is_in_wrong_book` is overridden by
    /// the post-patch `is_favorite` value.
    pub fn apply(mut self, patch: AnswerPatch) -> Self {
        if let Some(v) = patch.is_answered {
            self.is_answered = v;
        }
        if let Some(v) = patch.is_correct {
            self.is_correct = v;
        }
        if let Some(v) = patch.selected_answer {
            self.selected_answer = v;
        }
        if let Some(v) = patch.is_favorite {
            self.is_favorite = v;
        }
        if let Some(v) = patch.is_in_wrong_book {
            self.is_in_wrong_book = v;
        }
        if let Some(v) = patch.is_uncertain {
            self.is_uncertain = v;
        }
        if let Some(v) = patch.wrong_count {
            self.wrong_count = v;
        }

        // Wrong-book membership tracks favorite state, not the caller.
        self.is_in_wrong_book = self.is_favorite;
        self.updated_at = Utc::now();
        self
    }

    /// Resets answer-session state, preserving favorite/wrong-book
    /// membership and the lifetime wrong count
    pub fn cleared(self) -> Self {
        self.apply(AnswerPatch {
            is_answered: Some(false),
            is_correct: Some(false),
            selected_answer: Some(None),
            is_uncertain: Some(false),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides_wrong_book_with_favorite() {
        let answer = UserAnswer::new("T1_001_1").apply(AnswerPatch {
            is_favorite: Some(true),
            is_in_wrong_book: Some(false),
            ..Default::default()
        });

        assert!(answer.is_favorite);
        assert!(answer.is_in_wrong_book);
    }

    #[test]
    fn test_apply_clears_wrong_book_when_unfavorited() {
        let answer = UserAnswer::new("T1_001_1")
            .apply(AnswerPatch {
                is_favorite: Some(true),
                ..Default::default()
            })
            .apply(AnswerPatch {
                is_favorite: Some(false),
                is_in_wrong_book: Some(true),
                ..Default::default()
            });

        assert!(!answer.is_favorite);
        assert!(!answer.is_in_wrong_book);
    }

    #[test]
    fn test_cleared_preserves_favorite_and_wrong_count() {
        let answer = UserAnswer::new("T1_001_1").apply(AnswerPatch {
            is_answered: Some(true),
            is_correct: Some(false),
            selected_answer: Some(Some("B".to_string())),
            is_favorite: Some(true),
            is_uncertain: Some(true),
            wrong_count: Some(3),
            ..Default::default()
        });

        let cleared = answer.cleared();

        assert!(!cleared.is_answered);
        assert!(!cleared.is_correct);
        assert_eq!(cleared.selected_answer, None);
        assert!(!cleared.is_uncertain);
        assert!(cleared.is_favorite);
        assert!(cleared.is_in_wrong_book);
        assert_eq!(cleared.wrong_count, 3);
    }
}
