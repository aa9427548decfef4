//! Daily completion checks

use crate::db;
use crate::domain::Domain;
use chrono::{DateTime, FixedOffset, Utc};
use recall_common::time::{local_day_bounds, now};
use recall_common::Result;
use sqlx::SqlitePool;

/// Answers "has this user answered domain X today?" in a fixed local zone
#[derive(Clone)]
pub struct CompletionTracker {
    pool: SqlitePool,
    offset: FixedOffset,
}

impl CompletionTracker {
    pub fn new(pool: SqlitePool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    pub async fn is_completed_today(&self, user_id: i64, domain: Domain) -> Result<bool> {
        self.is_completed_at(user_id, domain, now()).await
    }

    /// Whether an answer exists on the local day containing `instant`
    pub async fn is_completed_at(&self, user_id: i64, domain: Domain, instant: DateTime<Utc>) -> Result<bool> {
        let (start, end) = local_day_bounds(instant, &self.offset);
        db::answers::exists_between(&self.pool, domain, user_id, start, end).await
    }
}
