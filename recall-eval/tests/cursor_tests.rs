//! Question cursor pagination tests

mod helpers;

use chrono::Utc;
use helpers::{memory_pool, seed_questions, temp_store};
use recall_eval::cursor::QuestionCursor;
use recall_eval::db;
use recall_eval::domain::{Answer, AnswerInput, Domain, MediaKind, NewQuestion, Score};
use reqwest::Url;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tempfile::TempDir;

async fn answer(pool: &SqlitePool, domain: Domain, user_id: i64, question_id: i64) {
    let input = AnswerInput {
        question_id,
        user_id,
        answer_text: "answer".to_string(),
        media_path: None,
        media_kind: domain.policy().media_filter,
        created_at: Utc::now(),
    };
    db::answers::insert_answer(
        pool,
        domain.policy().answer_table,
        &Answer::graded(input, Score::new(50).unwrap()),
    )
    .await
    .unwrap();
}

async fn next_ids(cursor: &QuestionCursor, user_id: i64, domain: Domain) -> Vec<i64> {
    cursor
        .next_questions(user_id, domain)
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.id)
        .collect()
}

#[tokio::test]
async fn test_new_user_starts_at_beginning() {
    let pool = memory_pool().await;
    let ids = seed_questions(&pool, Domain::Basic, None, 5).await;

    assert_eq!(next_ids(&QuestionCursor::new(pool), 1, Domain::Basic).await, ids[..3]);
}

#[tokio::test]
async fn test_wraps_around_after_last_question() {
    let pool = memory_pool().await;
    let ids = seed_questions(&pool, Domain::Basic, None, 5).await;
    answer(&pool, Domain::Basic, 1, ids[3]).await;

    let next = next_ids(&QuestionCursor::new(pool), 1, Domain::Basic).await;
    assert_eq!(next, vec![ids[4], ids[0], ids[1]]);
}

#[tokio::test]
async fn test_cursor_at_end_restarts() {
    let pool = memory_pool().await;
    let ids = seed_questions(&pool, Domain::Basic, None, 5).await;
    answer(&pool, Domain::Basic, 1, ids[1]).await;
    answer(&pool, Domain::Basic, 1, ids[4]).await;

    assert_eq!(next_ids(&QuestionCursor::new(pool), 1, Domain::Basic).await, ids[..3]);
}

#[tokio::test]
async fn test_small_domain_never_repeats() {
    let pool = memory_pool().await;
    let ids = seed_questions(&pool, Domain::Basic, None, 2).await;
    answer(&pool, Domain::Basic, 1, ids[0]).await;

    let next = next_ids(&QuestionCursor::new(pool), 1, Domain::Basic).await;
    assert_eq!(next, vec![ids[1], ids[0]]);
}

#[tokio::test]
async fn test_empty_domain_returns_nothing() {
    let pool = memory_pool().await;
    assert!(next_ids(&QuestionCursor::new(pool), 1, Domain::Survey).await.is_empty());
}

#[tokio::test]
async fn test_page_size_is_min_of_three_and_total() {
    for total in 0..6 {
        let pool = memory_pool().await;
        let ids = seed_questions(&pool, Domain::Basic, None, total).await;
        let cursor = QuestionCursor::new(pool.clone());

        for answered in ids.iter().copied() {
            answer(&pool, Domain::Basic, 1, answered).await;
            let next = next_ids(&cursor, 1, Domain::Basic).await;
            assert_eq!(next.len(), total.min(3), "total {} cursor {}", total, answered);

            let mut unique = next.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), next.len());
        }
    }
}

#[tokio::test]
async fn test_cursor_is_per_user() {
    let pool = memory_pool().await;
    let ids = seed_questions(&pool, Domain::Basic, None, 5).await;
    answer(&pool, Domain::Basic, 1, ids[2]).await;

    let cursor = QuestionCursor::new(pool);
    assert_eq!(next_ids(&cursor, 1, Domain::Basic).await, ids[3..5].iter().chain(&ids[..1]).copied().collect::<Vec<_>>());
    assert_eq!(next_ids(&cursor, 2, Domain::Basic).await, ids[..3]);
}

#[tokio::test]
async fn test_personal_questions_are_scoped_to_owner() {
    let pool = memory_pool().await;
    let mine = seed_questions(&pool, Domain::Personal, Some(7), 2).await;
    let theirs = seed_questions(&pool, Domain::Personal, Some(8), 3).await;

    let cursor = QuestionCursor::new(pool);
    assert_eq!(next_ids(&cursor, 7, Domain::Personal).await, mine);
    assert_eq!(next_ids(&cursor, 8, Domain::Personal).await, theirs);
}

#[tokio::test]
async fn test_cognitive_domains_split_by_media_type() {
    let pool = memory_pool().await;
    let audio = seed_questions(&pool, Domain::CognitiveAudio, None, 2).await;
    let image = seed_questions(&pool, Domain::CognitiveImage, None, 2).await;
    answer(&pool, Domain::CognitiveImage, 1, image[1]).await;

    let cursor = QuestionCursor::new(pool);
    // The image answer does not move the audio cursor
    assert_eq!(next_ids(&cursor, 1, Domain::CognitiveAudio).await, audio);
    assert_eq!(next_ids(&cursor, 1, Domain::CognitiveImage).await, image);
}

#[tokio::test]
async fn test_media_references_are_presigned() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let pool = memory_pool().await;

    let question = NewQuestion {
        user_id: None,
        content: "이 사진은 어디인가요?".to_string(),
        media_url: Some("http://media.test/recall-media/cognitive-image/q1.jpg".to_string()),
        media_kind: Some(MediaKind::Image),
        created_at: Utc::now(),
    };
    db::questions::insert_question(&pool, "cognitive_questions", &question)
        .await
        .unwrap();

    let questions = QuestionCursor::new(pool)
        .with_media_store(store.clone())
        .next_questions(1, Domain::CognitiveImage)
        .await
        .unwrap();

    let url = Url::parse(questions[0].media_url.as_deref().unwrap()).unwrap();
    assert_eq!(url.path(), "/recall-media/cognitive-image/q1.jpg");

    let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(query["content-type"], "image/jpeg");
    let expires: i64 = query["expires"].parse().unwrap();
    assert!(store.verify(
        "cognitive-image/q1.jpg",
        "image/jpeg",
        expires,
        &query["signature"],
        Utc::now()
    ));
}
