//! Answer evaluation pipeline
//!
//! A submission moves through
//! `Ingested → Transcribed | Passthrough → Scored → Persisted`; a step that
//! fails ends it with a [`PipelineError`] naming the [`Stage`]. Ingestion happens synchronously in [`Submission`];
//! everything after runs on the [`WorkerPool`]. A failed job writes nothing
//! and is not retried.

mod events;
mod submission;
mod worker;

pub use events::{spawn_logging_sink, PipelineEvent};
pub use submission::{SubmitError, Submission};
pub use worker::WorkerPool;

use crate::db;
use crate::domain::{Answer, AnswerInput, Domain, MediaKind, Score};
use crate::judge::{EvaluationError, Judge};
use crate::router::{PersistError, Record, ResultRouter};
use crate::transcription::{Transcriber, TranscriptionError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Work scheduled after a successful ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationJob {
    pub domain: Domain,
    pub question_id: i64,
    pub user_id: i64,
    /// Key the answer text is derived from
    pub storage_key: String,
    /// Key of the upload as received, stored on the answer
    pub media_path: String,
    pub media_kind: MediaKind,
    pub submitted_at: DateTime<Utc>,
}

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Ingested,
    Transcribed,
    Passthrough,
    Scored,
    Persisted,
}

/// Step that was running when a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResolveQuestion,
    Transcribe,
    Score,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ResolveQuestion => "resolve_question",
            Stage::Transcribe => "transcribe",
            Stage::Score => "score",
            Stage::Persist => "persist",
        })
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Question {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Database(#[from] recall_common::Error),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Failure of one job, tagged with where it happened
#[derive(Debug, Error)]
#[error("{domain} evaluation of question {question_id} failed at {stage}: {cause}")]
pub struct PipelineError {
    pub domain: Domain,
    pub question_id: i64,
    pub user_id: i64,
    pub stage: Stage,
    #[source]
    pub cause: StageError,
}

/// Result of a job that reached `Persisted`
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub domain: Domain,
    pub question_id: i64,
    pub user_id: i64,
    pub answer_id: i64,
    pub score: Option<Score>,
    pub is_match: bool,
    /// States visited, in order
    pub path: Vec<PipelineState>,
}

pub struct EvaluationPipeline {
    pool: SqlitePool,
    transcriber: Arc<dyn Transcriber>,
    judge: Arc<dyn Judge>,
    router: ResultRouter,
}

impl EvaluationPipeline {
    pub fn new(
        pool: SqlitePool,
        transcriber: Arc<dyn Transcriber>,
        judge: Arc<dyn Judge>,
        router: ResultRouter,
    ) -> Self {
        Self {
            pool,
            transcriber,
            judge,
            router,
        }
    }

    pub async fn evaluate(&self, job: &EvaluationJob) -> Result<EvaluationOutcome, PipelineError> {
        let fail = |stage: Stage| {
            move |cause: StageError| PipelineError {
                domain: job.domain,
                question_id: job.question_id,
                user_id: job.user_id,
                stage,
                cause,
            }
        };
        let mut path = vec![PipelineState::Ingested];

        let question = db::questions::find_question(&self.pool, job.domain, job.user_id, job.question_id)
            .await
            .map_err(StageError::from)
            .and_then(|q| q.ok_or(StageError::NotFound(job.question_id)))
            .map_err(fail(Stage::ResolveQuestion))?;

        let answer_text = if job.media_kind.policy().transcribe {
            let text = self
                .transcriber
                .transcribe(&job.storage_key)
                .await
                .map_err(|e| fail(Stage::Transcribe)(e.into()))?;
            path.push(PipelineState::Transcribed);
            text
        } else {
            // Nothing to transcribe; the judge sees the object reference
            path.push(PipelineState::Passthrough);
            job.storage_key.clone()
        };
        debug!(domain = %job.domain, question_id = job.question_id, state = ?path.last(), "Answer text ready");

        let input = AnswerInput {
            question_id: question.id,
            user_id: job.user_id,
            answer_text,
            media_path: Some(job.media_path.clone()),
            media_kind: Some(job.domain.answer_media_kind(job.media_kind)),
            created_at: job.submitted_at,
        };

        let answer = if job.domain.policy().scored {
            let score = self
                .judge
                .score(&question.content, &input.answer_text)
                .await
                .map_err(|e| fail(Stage::Score)(e.into()))?;
            path.push(PipelineState::Scored);
            Answer::graded(input, score)
        } else {
            Answer::ungraded(input)
        };

        let score = answer.score();
        let is_match = answer.is_match();
        let answer_id = self
            .router
            .save(&Record::answer(job.domain, answer))
            .await
            .map_err(|e| fail(Stage::Persist)(e.into()))?;
        path.push(PipelineState::Persisted);

        info!(
            domain = %job.domain,
            question_id = job.question_id,
            user_id = job.user_id,
            answer_id,
            score = score.map(|s| s.value()),
            is_match,
            "Answer evaluated"
        );

        Ok(EvaluationOutcome {
            domain: job.domain,
            question_id: job.question_id,
            user_id: job.user_id,
            answer_id,
            score,
            is_match,
            path,
        })
    }
}
