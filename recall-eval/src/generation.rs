//! Batch question generation
//!
//! Both runs ask the judge backend for a list of questions and append each one
//! through the result router. A failing item is logged and skipped; only a
//! failure to obtain the list at all fails the run.

use crate::db;
use crate::domain::NewQuestion;
use crate::judge::{EvaluationError, Judge};
use crate::router::{PersistError, Record, ResultRouter};
use chrono::{DateTime, FixedOffset, Utc};
use recall_common::time::{local_day_bounds, now};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ScheduledGenerationError {
    #[error("Question generation failed: {0}")]
    Judge(#[from] EvaluationError),

    #[error(transparent)]
    Database(#[from] recall_common::Error),

    #[error("Failed to save generated question: {0}")]
    Persist(#[from] PersistError),
}

/// Counts for one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub saved: usize,
    pub skipped: usize,
}

impl GenerationReport {
    fn merge(&mut self, other: GenerationReport) {
        self.saved += other.saved;
        self.skipped += other.skipped;
    }
}

pub struct QuestionGenerator {
    pool: SqlitePool,
    judge: Arc<dyn Judge>,
    router: ResultRouter,
    offset: FixedOffset,
}

impl QuestionGenerator {
    pub fn new(pool: SqlitePool, judge: Arc<dyn Judge>, router: ResultRouter, offset: FixedOffset) -> Self {
        Self {
            pool,
            judge,
            router,
            offset,
        }
    }

    /// Generate the shared survey question set
    pub async fn generate_survey_questions(&self) -> Result<GenerationReport, ScheduledGenerationError> {
        let questions = self.judge.generate_daily_questions().await?;
        let created_at = now();

        let report = self
            .save_all(questions, |content| {
                Record::SurveyQuestion(NewQuestion::text(content, None, created_at))
            })
            .await;

        info!(saved = report.saved, skipped = report.skipped, "Survey questions generated");
        Ok(report)
    }

    /// Generate personal questions for `user_id` from today's survey answers
    pub async fn generate_personal_questions(&self, user_id: i64) -> Result<GenerationReport, ScheduledGenerationError> {
        self.generate_personal_questions_at(user_id, now()).await
    }

    /// Same as [`Self::generate_personal_questions`] for the local day containing `instant`
    pub async fn generate_personal_questions_at(
        &self,
        user_id: i64,
        instant: DateTime<Utc>,
    ) -> Result<GenerationReport, ScheduledGenerationError> {
        let (start, end) = local_day_bounds(instant, &self.offset);
        let answers = db::answers::survey_qa_between(&self.pool, user_id, start, end).await?;

        if answers.is_empty() {
            info!(user_id, "No survey answers today; skipping personal questions");
            return Ok(GenerationReport::default());
        }

        let questions = self.judge.generate_personal_questions(&answers).await?;
        let created_at = now();

        let report = self
            .save_all(questions, |content| {
                Record::PersonalQuestion(NewQuestion::text(content, Some(user_id), created_at))
            })
            .await;

        info!(
            user_id,
            survey_answers = answers.len(),
            saved = report.saved,
            skipped = report.skipped,
            "Personal questions generated"
        );
        Ok(report)
    }

    /// Personal questions for every user who answered the survey on the local
    /// day containing `instant`; a failing user is logged and skipped
    pub async fn generate_personal_for_day(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<GenerationReport, ScheduledGenerationError> {
        let (start, end) = local_day_bounds(instant, &self.offset);
        let users = db::answers::survey_respondents_between(&self.pool, start, end).await?;

        let mut total = GenerationReport::default();
        for user_id in users {
            match self.generate_personal_questions_at(user_id, instant).await {
                Ok(report) => total.merge(report),
                Err(e) => {
                    warn!(user_id, error = %e, "Personal question generation failed");
                    total.skipped += 1;
                }
            }
        }
        Ok(total)
    }

    async fn save_all<F>(&self, questions: Vec<String>, to_record: F) -> GenerationReport
    where
        F: Fn(String) -> Record,
    {
        let mut report = GenerationReport::default();

        for content in questions {
            match self.router.save(&to_record(content)).await {
                Ok(id) => {
                    debug!(id, "Saved generated question");
                    report.saved += 1;
                }
                Err(PersistError::Duplicate(table)) => {
                    debug!(table, "Skipping duplicate question");
                    report.skipped += 1;
                }
                Err(e) => {
                    let err = ScheduledGenerationError::from(e);
                    warn!(error = %err, "Skipping generated question");
                    report.skipped += 1;
                }
            }
        }

        report
    }
}
