//! Result router dispatch tests

mod helpers;

use chrono::Utc;
use helpers::{memory_pool, seed_questions};
use recall_eval::db;
use recall_eval::domain::{Answer, AnswerInput, Domain, MediaKind, NewQuestion, Score};
use recall_eval::router::{Collection, PersistError, Record, RecordKind, ResultRouter};

fn graded(question_id: i64, score: u32) -> Answer {
    Answer::graded(
        AnswerInput {
            question_id,
            user_id: 3,
            answer_text: "seoul".to_string(),
            media_path: Some("basic/x_a.mp4".to_string()),
            media_kind: Some(MediaKind::Audio),
            created_at: Utc::now(),
        },
        Score::new(score).unwrap(),
    )
}

#[tokio::test]
async fn test_standard_router_registers_every_kind() {
    let pool = memory_pool().await;
    let router = ResultRouter::standard(pool);
    for kind in RecordKind::ALL {
        assert!(router.is_registered(kind), "{} not registered", kind);
    }
}

#[tokio::test]
async fn test_answers_land_in_their_domain_table() {
    let pool = memory_pool().await;
    let router = ResultRouter::standard(pool.clone());

    for domain in [Domain::Basic, Domain::Personal, Domain::CognitiveAudio] {
        let q = seed_questions(&pool, domain, Some(3), 1).await[0];
        let id = router.save(&Record::answer(domain, graded(q, 90))).await.unwrap();

        let rows = db::answers::list_answers(&pool, domain, 3).await.unwrap();
        assert_eq!(rows.len(), 1, "{}", domain);
        assert_eq!(rows[0].id, id);
    }
}

#[tokio::test]
async fn test_unregistered_kind_is_rejected() {
    let pool = memory_pool().await;
    let q = seed_questions(&pool, Domain::Basic, None, 1).await[0];
    let router = ResultRouter::builder(pool.clone())
        .register(RecordKind::PersonalAnswer, Collection::Answers("personal_answers"))
        .build();

    let err = router
        .save(&Record::answer(Domain::Basic, graded(q, 90)))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::UnsupportedRecordType(RecordKind::BasicAnswer)));
    assert!(db::answers::list_answers(&pool, Domain::Basic, 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_answer_routed_to_question_collection_is_mismatch() {
    let pool = memory_pool().await;
    let q = seed_questions(&pool, Domain::Basic, None, 1).await[0];
    let router = ResultRouter::builder(pool)
        .register(RecordKind::BasicAnswer, Collection::Questions("basic_questions"))
        .build();

    let err = router
        .save(&Record::answer(Domain::Basic, graded(q, 10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistError::CollectionMismatch {
            kind: RecordKind::BasicAnswer,
            table: "basic_questions"
        }
    ));
}

#[tokio::test]
async fn test_duplicate_survey_question_is_reported() {
    let pool = memory_pool().await;
    let router = ResultRouter::standard(pool);
    let question = NewQuestion::text("오늘 점심은 무엇을 드셨나요?", None, Utc::now());

    router.save(&Record::SurveyQuestion(question.clone())).await.unwrap();
    let err = router.save(&Record::SurveyQuestion(question)).await.unwrap_err();
    assert!(matches!(err, PersistError::Duplicate("survey_questions")));
}

#[tokio::test]
async fn test_personal_question_keeps_owner() {
    let pool = memory_pool().await;
    let router = ResultRouter::standard(pool.clone());

    let id = router
        .save(&Record::PersonalQuestion(NewQuestion::text(
            "어제 산책은 어디로 가셨나요?",
            Some(11),
            Utc::now(),
        )))
        .await
        .unwrap();

    let question = db::questions::find_question(&pool, Domain::Personal, 11, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(question.user_id, Some(11));
}

#[tokio::test]
async fn test_answer_for_missing_question_is_database_error() {
    let pool = memory_pool().await;
    let router = ResultRouter::standard(pool);

    let err = router
        .save(&Record::answer(Domain::Basic, graded(404, 50)))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::Database(_)));
}
