//! Submission entry point

use super::{EvaluationJob, WorkerPool};
use crate::domain::{Domain, MediaKind};
use crate::ingest::{IngestError, MediaIngestor, Upload};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Domain {domain} does not accept {kind} answers")]
    UnsupportedMediaKind { domain: Domain, kind: MediaKind },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Evaluation queue is full")]
    QueueFull,

    #[error("Evaluation workers are shutting down")]
    ShuttingDown,
}

/// Ingests an upload and schedules its evaluation
#[derive(Clone)]
pub struct Submission {
    ingestor: Arc<MediaIngestor>,
    workers: Arc<WorkerPool>,
}

impl Submission {
    pub fn new(ingestor: Arc<MediaIngestor>, workers: Arc<WorkerPool>) -> Self {
        Self { ingestor, workers }
    }

    /// Store the upload and queue its evaluation, returning the storage key
    ///
    /// Returns once the job is queued; the evaluation result is only visible
    /// through the pipeline event bus and the persisted answer.
    pub async fn submit(
        &self,
        domain: Domain,
        question_id: i64,
        user_id: i64,
        upload: Upload,
        media_kind: Option<MediaKind>,
    ) -> Result<String, SubmitError> {
        let kind = media_kind.unwrap_or(domain.policy().default_kind);
        if !domain.accepts(kind) {
            return Err(SubmitError::UnsupportedMediaKind { domain, kind });
        }

        let receipt = self.ingestor.ingest(&upload, domain, kind).await?;

        let job = EvaluationJob {
            domain,
            question_id,
            user_id,
            storage_key: receipt.storage_key.clone(),
            media_path: receipt.media_path,
            media_kind: kind,
            submitted_at: recall_common::time::now(),
        };
        let job_id = self.workers.enqueue(job).await?;

        info!(
            %job_id,
            %domain,
            question_id,
            user_id,
            storage_key = %receipt.storage_key,
            "Answer submitted"
        );
        Ok(receipt.storage_key)
    }
}
