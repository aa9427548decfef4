//! Answer queries
//!
//! Answers are append-only: nothing here updates or deletes a row.

use super::push_media_filter;
use crate::domain::{Answer, Domain, SurveyQa};
use chrono::{DateTime, Utc};
use recall_common::time::{format_timestamp, parse_timestamp};
use recall_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Answer row as persisted
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnswer {
    pub id: i64,
    pub question_id: i64,
    pub user_id: i64,
    pub answer_text: String,
    pub score: Option<i64>,
    pub is_match: bool,
    pub media_path: Option<String>,
    pub media_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn answer_from_row(row: &SqliteRow) -> Result<StoredAnswer> {
    let created_at: String = row.get("created_at");
    Ok(StoredAnswer {
        id: row.get("id"),
        question_id: row.get("question_id"),
        user_id: row.get("user_id"),
        answer_text: row.get("answer_text"),
        score: row.get("score"),
        is_match: row.get::<i64, _>("is_match") != 0,
        media_path: row.get("media_path"),
        media_type: row.get("media_type"),
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Append an answer to `table`, returning its id
pub async fn insert_answer(pool: &SqlitePool, table: &str, answer: &Answer) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} (question_id, user_id, answer_text, score, is_match, media_path, media_type, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        table
    );

    let result = sqlx::query(&sql)
        .bind(answer.question_id())
        .bind(answer.user_id())
        .bind(answer.answer_text())
        .bind(answer.score().map(|s| i64::from(s.value())))
        .bind(answer.is_match())
        .bind(answer.media_path())
        .bind(answer.media_kind().map(|k| k.as_str()))
        .bind(format_timestamp(answer.created_at()))
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Highest question id `user_id` has answered in `domain`, 0 if none
pub async fn max_answered_question_id(pool: &SqlitePool, domain: Domain, user_id: i64) -> Result<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT COALESCE(MAX(question_id), 0) FROM {} WHERE user_id = ",
        domain.policy().answer_table
    ));
    qb.push_bind(user_id);
    push_media_filter(&mut qb, domain);

    let max: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(max)
}

/// Whether `user_id` has an answer in `domain` created within `[start, end)`
pub async fn exists_between(
    pool: &SqlitePool,
    domain: Domain,
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<bool> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = ",
        domain.policy().answer_table
    ));
    qb.push_bind(user_id);
    qb.push(" AND created_at >= ").push_bind(format_timestamp(start));
    qb.push(" AND created_at < ").push_bind(format_timestamp(end));
    push_media_filter(&mut qb, domain);
    qb.push(")");

    let exists: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(exists != 0)
}

/// Survey questions with the answers `user_id` gave within `[start, end)`
pub async fn survey_qa_between(
    pool: &SqlitePool,
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<SurveyQa>> {
    let rows = sqlx::query(
        r#"
        SELECT q.id AS question_id, q.content AS question, a.answer_text AS answer, a.created_at AS created_at
        FROM survey_answers a
        JOIN survey_questions q ON q.id = a.question_id
        WHERE a.user_id = ? AND a.created_at >= ? AND a.created_at < ?
        ORDER BY a.created_at ASC, a.id ASC
        "#,
    )
    .bind(user_id)
    .bind(format_timestamp(start))
    .bind(format_timestamp(end))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let created_at: String = row.get("created_at");
            Ok(SurveyQa {
                question_id: row.get("question_id"),
                question: row.get("question"),
                answer: row.get("answer"),
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .collect()
}

/// Users with at least one survey answer within `[start, end)`
pub async fn survey_respondents_between(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<i64>> {
    let users = sqlx::query_scalar(
        "SELECT DISTINCT user_id FROM survey_answers WHERE created_at >= ? AND created_at < ? ORDER BY user_id",
    )
    .bind(format_timestamp(start))
    .bind(format_timestamp(end))
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// All answers of `user_id` in `domain`, oldest first
pub async fn list_answers(pool: &SqlitePool, domain: Domain, user_id: i64) -> Result<Vec<StoredAnswer>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT id, question_id, user_id, answer_text, score, is_match, media_path, media_type, created_at \
         FROM {} WHERE user_id = ",
        domain.policy().answer_table
    ));
    qb.push_bind(user_id);
    push_media_filter(&mut qb, domain);
    qb.push(" ORDER BY id ASC");

    qb.build()
        .fetch_all(pool)
        .await?
        .iter()
        .map(answer_from_row)
        .collect()
}
