//! Database initialization
//!
//! Every question table shares one column layout and every answer table
//! shares another, so the service can address them by table name alone.

use super::{ANSWER_TABLES, QUESTION_TABLES};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open (creating if needed) the database file and create tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// The connection is never recycled; closing it would drop the data.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for table in QUESTION_TABLES {
        create_question_table(pool, table).await?;
    }
    for (table, question_table) in ANSWER_TABLES {
        create_answer_table(pool, table, question_table).await?;
    }
    Ok(())
}

async fn create_question_table(pool: &SqlitePool, table: &str) -> Result<()> {
    // Survey questions are generated in batches; the unique content lets a
    // rerun skip what already exists.
    let content_constraint = if table == "survey_questions" { " UNIQUE" } else { "" };

    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            content TEXT NOT NULL{content_constraint},
            media_url TEXT,
            media_type TEXT,
            created_at TEXT NOT NULL
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    let index = format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_user ON {table}(user_id, id)"
    );
    sqlx::query(&index).execute(pool).await?;

    Ok(())
}

async fn create_answer_table(pool: &SqlitePool, table: &str, question_table: &str) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id INTEGER NOT NULL REFERENCES {question_table}(id),
            user_id INTEGER NOT NULL,
            answer_text TEXT NOT NULL,
            score INTEGER CHECK (score IS NULL OR (score >= 0 AND score <= 100)),
            is_match INTEGER NOT NULL DEFAULT 0,
            media_path TEXT,
            media_type TEXT,
            created_at TEXT NOT NULL
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    let by_day = format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_user_created ON {table}(user_id, created_at)"
    );
    sqlx::query(&by_day).execute(pool).await?;

    let by_question = format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_user_question ON {table}(user_id, question_id)"
    );
    sqlx::query(&by_question).execute(pool).await?;

    Ok(())
}
