use super::*;
use crate::test_utils::setup_kv;

fn store() -> AnswerStore {
    AnswerStore::open(setup_kv())
}

#[tokio::test]
async fn test_set_creates_record_on_first_interaction() {
    let store = store();

    assert!(store.get("T1_001_1").await.is_none());

    let answer = store
        .set(
            "T1_001_1",
            AnswerPatch {
                is_answered: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(answer.question_id, "T1_001_1");
    assert!(answer.is_answered);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_every_set_keeps_wrong_book_equal_to_favorite() {
    let store = store();

    // Try hard to desynchronize the pair; the store must not let us
    let a = store
        .set(
            "q",
            AnswerPatch {
                is_favorite: Some(true),
                is_in_wrong_book: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(a.is_favorite && a.is_in_wrong_book);

    let b = store
        .set(
            "q",
            AnswerPatch {
                is_in_wrong_book: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(b.is_favorite && b.is_in_wrong_book);

    let c = store
        .set(
            "q",
            AnswerPatch {
                is_favorite: Some(false),
                is_in_wrong_book: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!c.is_favorite && !c.is_in_wrong_book);
}

#[tokio::test]
async fn test_writes_persist_immediately() {
    let kv = setup_kv();
    let store = AnswerStore::open(kv.clone());

    store.toggle_favorite("T1_001_1").await.unwrap();

    // A second store over the same kv sees the write
    let reopened = AnswerStore::open(kv);
    let answer = reopened.get("T1_001_1").await.unwrap();
    assert!(answer.is_favorite);
    assert!(answer.is_in_wrong_book);
}

#[tokio::test]
async fn test_toggle_favorite_is_an_involution_through_persistence() {
    let kv = setup_kv();

    let store = AnswerStore::open(kv.clone());
    let toggled = store.toggle_favorite("q").await.unwrap();
    assert!(toggled.is_favorite);

    // Round-trip through persistence between the two toggles
    let store = AnswerStore::open(kv.clone());
    let toggled_back = store.toggle_favorite("q").await.unwrap();
    assert!(!toggled_back.is_favorite);
    assert!(!toggled_back.is_in_wrong_book);

    let store = AnswerStore::open(kv);
    assert!(!store.get("q").await.unwrap().is_favorite);
}

#[tokio::test]
async fn test_remove_from_wrong_book_clears_all_three_flags() {
    let store = store();

    store
        .set(
            "q",
            AnswerPatch {
                is_favorite: Some(true),
                is_uncertain: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let removed = store.remove_from_wrong_book("q").await.unwrap();

    assert!(!removed.is_favorite);
    assert!(!removed.is_in_wrong_book);
    assert!(!removed.is_uncertain);
}

#[tokio::test]
async fn test_record_answer_correct_and_incorrect() {
    let store = store();

    let hit = store.record_answer("q1", "b", "B").await.unwrap();
    assert!(hit.is_answered);
    assert!(hit.is_correct);
    assert_eq!(hit.wrong_count, 0);
    assert!(!hit.is_in_wrong_book);

    let miss = store.record_answer("q2", "A", "B").await.unwrap();
    assert!(miss.is_answered);
    assert!(!miss.is_correct);
    assert_eq!(miss.wrong_count, 1);
    assert!(miss.is_favorite);
    assert!(miss.is_in_wrong_book);

    let miss_again = store.record_answer("q2", "C", "B").await.unwrap();
    assert_eq!(miss_again.wrong_count, 2);
}

#[tokio::test]
async fn test_multi_choice_selection_order_does_not_matter() {
    let store = store();

    let hit = store.record_answer("q", "c,a", "A,C").await.unwrap();
    assert!(hit.is_correct);

    let miss = store.record_answer("q", "a", "A,C").await.unwrap();
    assert!(!miss.is_correct);
}

#[tokio::test]
async fn test_clear_answers_preserves_favorites() {
    let store = store();

    // N answered questions, K of them favorited
    let ids = ["q1", "q2", "q3", "q4", "q5"];
    for id in ids {
        store.record_answer(id, "A", "A").await.unwrap();
    }
    for id in ["q2", "q4"] {
        store.toggle_favorite(id).await.unwrap();
    }

    let cleared = store.clear_answers(ids).await.unwrap();
    assert_eq!(cleared, ids.len());

    let mut favorites = 0;
    for id in ids {
        let answer = store.get(id).await.unwrap();
        assert!(!answer.is_answered);
        assert!(!answer.is_correct);
        assert_eq!(answer.selected_answer, None);
        if answer.is_favorite {
            assert!(answer.is_in_wrong_book);
            favorites += 1;
        }
    }
    assert_eq!(favorites, 2);
}

#[tokio::test]
async fn test_clear_answers_ignores_unknown_ids() {
    let store = store();

    store.record_answer("known", "A", "A").await.unwrap();

    let cleared = store.clear_answers(["known", "never_seen"]).await.unwrap();

    assert_eq!(cleared, 1);
    assert!(store.get("never_seen").await.is_none());
}

#[tokio::test]
async fn test_clear_wrong_book_answers_keeps_membership() {
    let store = store();

    store.record_answer("wrong1", "A", "B").await.unwrap();
    store.record_answer("wrong2", "A", "C").await.unwrap();
    store.record_answer("right", "A", "A").await.unwrap();

    let cleared = store.clear_wrong_book_answers().await.unwrap();
    assert_eq!(cleared, 2);

    // Members stay in the wrong book, ready for another pass
    let wrong_book = store.wrong_book().await;
    assert_eq!(wrong_book.len(), 2);
    for member in wrong_book {
        assert!(!member.is_answered);
        assert!(member.is_favorite);
        assert_eq!(member.wrong_count, 1);
    }

    // The correctly answered question was untouched
    assert!(store.get("right").await.unwrap().is_answered);
}

#[tokio::test]
async fn test_wipe_empties_store_and_persistence() {
    let kv = setup_kv();
    let store = AnswerStore::open(kv.clone());

    store.record_answer("q", "A", "A").await.unwrap();
    store.wipe().await.unwrap();

    assert!(store.is_empty().await);
    assert!(AnswerStore::open(kv).is_empty().await);
}

#[tokio::test]
async fn test_open_survives_corrupt_persisted_map() {
    let kv = setup_kv();
    kv.put(keys::USER_ANSWERS, &"not a map").await.unwrap();

    let store = AnswerStore::open(kv);

    assert!(store.is_empty().await);
}
