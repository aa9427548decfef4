//! Question queries

use super::push_media_filter;
use crate::domain::{Domain, NewQuestion, Question};
use recall_common::time::{format_timestamp, parse_timestamp};
use recall_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const COLUMNS: &str = "id, user_id, content, media_url, media_type, created_at";

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    let media_type: Option<String> = row.get("media_type");
    let created_at: String = row.get("created_at");

    Ok(Question {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        media_url: row.get("media_url"),
        media_kind: media_type.and_then(|m| m.parse().ok()),
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Questions of `domain` visible to `user_id`
fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, domain: Domain, user_id: i64) {
    if domain.policy().owned_questions {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    push_media_filter(qb, domain);
}

/// Load a question of `domain` by id, if `user_id` may answer it
pub async fn find_question(pool: &SqlitePool, domain: Domain, user_id: i64, id: i64) -> Result<Option<Question>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM {} WHERE id = ",
        COLUMNS,
        domain.policy().question_table
    ));
    qb.push_bind(id);
    push_scope(&mut qb, domain, user_id);

    qb.build()
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(question_from_row)
        .transpose()
}

/// Up to `limit` questions with id greater than `after_id`, ascending
pub async fn questions_after(
    pool: &SqlitePool,
    domain: Domain,
    user_id: i64,
    after_id: i64,
    limit: i64,
) -> Result<Vec<Question>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM {} WHERE id > ",
        COLUMNS,
        domain.policy().question_table
    ));
    qb.push_bind(after_id);
    push_scope(&mut qb, domain, user_id);
    qb.push(" ORDER BY id ASC LIMIT ").push_bind(limit);

    qb.build()
        .fetch_all(pool)
        .await?
        .iter()
        .map(question_from_row)
        .collect()
}

/// Up to `limit` questions with id at most `up_to_id`, ascending from the start
pub async fn questions_up_to(
    pool: &SqlitePool,
    domain: Domain,
    user_id: i64,
    up_to_id: i64,
    limit: i64,
) -> Result<Vec<Question>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM {} WHERE id <= ",
        COLUMNS,
        domain.policy().question_table
    ));
    qb.push_bind(up_to_id);
    push_scope(&mut qb, domain, user_id);
    qb.push(" ORDER BY id ASC LIMIT ").push_bind(limit);

    qb.build()
        .fetch_all(pool)
        .await?
        .iter()
        .map(question_from_row)
        .collect()
}

/// Append a question to `table`, returning its id
pub async fn insert_question(pool: &SqlitePool, table: &str, question: &NewQuestion) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} (user_id, content, media_url, media_type, created_at) VALUES (?, ?, ?, ?, ?)",
        table
    );

    let result = sqlx::query(&sql)
        .bind(question.user_id)
        .bind(&question.content)
        .bind(&question.media_url)
        .bind(question.media_kind.map(|k| k.as_str()))
        .bind(format_timestamp(question.created_at))
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}
