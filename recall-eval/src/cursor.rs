//! Sequential question cursor
//!
//! A user's position in a domain is the highest question id they have
//! answered. The next page continues after it and wraps to the start of the
//! domain once the end is reached.

use crate::db;
use crate::domain::{Domain, Question};
use crate::storage::{MediaStore, PRESIGN_TTL};
use recall_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

/// Questions returned per page
pub const PAGE_SIZE: usize = 3;

#[derive(Clone)]
pub struct QuestionCursor {
    pool: SqlitePool,
    store: Option<Arc<dyn MediaStore>>,
}

impl QuestionCursor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, store: None }
    }

    /// Replace question media references with presigned URLs from `store`
    pub fn with_media_store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Next `min(PAGE_SIZE, N)` questions of `domain` for `user_id`
    ///
    /// Ids after the cursor come first in ascending order, then the wrap-around
    /// segment from the start of the domain, also ascending. No id repeats.
    pub async fn next_questions(&self, user_id: i64, domain: Domain) -> Result<Vec<Question>> {
        let cursor = db::answers::max_answered_question_id(&self.pool, domain, user_id).await?;

        let mut questions =
            db::questions::questions_after(&self.pool, domain, user_id, cursor, PAGE_SIZE as i64).await?;

        let remaining = PAGE_SIZE - questions.len();
        if remaining > 0 {
            let wrapped =
                db::questions::questions_up_to(&self.pool, domain, user_id, cursor, remaining as i64).await?;
            questions.extend(wrapped);
        }

        debug!(
            %domain,
            user_id,
            cursor,
            returned = questions.len(),
            "Selected next questions"
        );

        if let Some(store) = &self.store {
            for question in &mut questions {
                presign_media(store.as_ref(), domain, question).await;
            }
        }

        Ok(questions)
    }
}

/// Swap a stored media reference for a time-limited URL, keeping it on failure
async fn presign_media(store: &dyn MediaStore, domain: Domain, question: &mut Question) {
    let Some(reference) = question.media_url.as_deref() else {
        return;
    };

    let key = store.to_storage_key(reference);
    let kind = question.media_kind.unwrap_or(domain.policy().default_kind);

    match store.presign(&key, kind.policy().question_content_type, PRESIGN_TTL).await {
        Ok(url) => question.media_url = Some(url),
        Err(e) => {
            warn!(%domain, question_id = question.id, key = %key, error = %e, "Failed to presign question media");
        }
    }
}
