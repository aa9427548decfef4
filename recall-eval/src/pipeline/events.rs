//! Job outcome events

use super::{EvaluationOutcome, PipelineError, Stage};
use crate::domain::Domain;
use chrono::{DateTime, Utc};
use recall_common::events::EventBus;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Published once per finished job
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    Completed {
        job_id: Uuid,
        domain: Domain,
        question_id: i64,
        user_id: i64,
        answer_id: i64,
        score: Option<u8>,
        is_match: bool,
        timestamp: DateTime<Utc>,
    },
    Failed {
        job_id: Uuid,
        domain: Domain,
        question_id: i64,
        user_id: i64,
        stage: Stage,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn completed(job_id: Uuid, outcome: &EvaluationOutcome) -> Self {
        PipelineEvent::Completed {
            job_id,
            domain: outcome.domain,
            question_id: outcome.question_id,
            user_id: outcome.user_id,
            answer_id: outcome.answer_id,
            score: outcome.score.map(|s| s.value()),
            is_match: outcome.is_match,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(job_id: Uuid, err: &PipelineError) -> Self {
        PipelineEvent::Failed {
            job_id,
            domain: err.domain,
            question_id: err.question_id,
            user_id: err.user_id,
            stage: err.stage,
            error: err.cause.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Log every pipeline event until the bus is dropped
pub fn spawn_logging_sink(events: &EventBus<PipelineEvent>) -> JoinHandle<()> {
    let mut rx = events.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::Completed {
                    job_id,
                    domain,
                    question_id,
                    user_id,
                    answer_id,
                    score,
                    is_match,
                    ..
                }) => {
                    info!(
                        %job_id,
                        %domain,
                        question_id,
                        user_id,
                        answer_id,
                        score,
                        is_match,
                        "Evaluation completed"
                    );
                }
                Ok(PipelineEvent::Failed {
                    job_id,
                    domain,
                    question_id,
                    user_id,
                    stage,
                    error,
                    ..
                }) => {
                    error!(
                        %job_id,
                        %domain,
                        question_id,
                        user_id,
                        %stage,
                        %error,
                        "Evaluation failed"
                    );
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Pipeline log sink lagged; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
