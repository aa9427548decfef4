//! Bounded worker pool
//!
//! Jobs wait in a bounded queue; a dispatcher takes one only after a worker
//! permit is free, so at most `workers` jobs run and at most `queue_capacity`
//! wait. When the queue stays full for `enqueue_timeout` the submission is
//! refused instead of piling up tasks.

use super::{EvaluationJob, EvaluationPipeline, PipelineEvent, SubmitError};
use recall_common::events::EventBus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info};
use uuid::Uuid;

struct QueuedJob {
    id: Uuid,
    job: EvaluationJob,
}

pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    enqueue_timeout: Duration,
    events: EventBus<PipelineEvent>,
}

impl WorkerPool {
    /// Start the dispatcher; `workers` and `queue_capacity` are clamped to at least 1
    pub fn start(
        pipeline: Arc<EvaluationPipeline>,
        workers: usize,
        queue_capacity: usize,
        enqueue_timeout: Duration,
        events: EventBus<PipelineEvent>,
    ) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let dispatcher = tokio::spawn(dispatch(
            rx,
            pipeline,
            Arc::new(Semaphore::new(workers)),
            events.clone(),
        ));

        info!(workers, queue_capacity, "Evaluation worker pool started");

        Self {
            sender: Mutex::new(Some(tx)),
            dispatcher: Mutex::new(Some(dispatcher)),
            enqueue_timeout,
            events,
        }
    }

    pub fn events(&self) -> &EventBus<PipelineEvent> {
        &self.events
    }

    /// Queue a job, waiting at most `enqueue_timeout` for space
    pub async fn enqueue(&self, job: EvaluationJob) -> Result<Uuid, SubmitError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| SubmitError::ShuttingDown)?
            .clone()
            .ok_or(SubmitError::ShuttingDown)?;

        let id = Uuid::new_v4();
        let domain = job.domain;
        let question_id = job.question_id;

        match sender.send_timeout(QueuedJob { id, job }, self.enqueue_timeout).await {
            Ok(()) => {
                debug!(job_id = %id, %domain, question_id, "Queued evaluation");
                Ok(id)
            }
            Err(SendTimeoutError::Timeout(_)) => Err(SubmitError::QueueFull),
            Err(SendTimeoutError::Closed(_)) => Err(SubmitError::ShuttingDown),
        }
    }

    /// Stop accepting jobs and wait for queued and running ones to finish
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut s| s.take());
        drop(sender);

        let dispatcher = self.dispatcher.lock().ok().and_then(|mut d| d.take());
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker pool dispatcher failed");
            }
        }
        info!("Evaluation worker pool stopped");
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<QueuedJob>,
    pipeline: Arc<EvaluationPipeline>,
    permits: Arc<Semaphore>,
    events: EventBus<PipelineEvent>,
) {
    let mut tasks = JoinSet::new();

    loop {
        // Reap finished jobs before taking another permit
        let permit = tokio::select! {
            biased;
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                log_join(joined);
                continue;
            }
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let Some(queued) = rx.recv().await else {
            break;
        };

        let pipeline = Arc::clone(&pipeline);
        let events = events.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let event = match pipeline.evaluate(&queued.job).await {
                Ok(outcome) => PipelineEvent::completed(queued.id, &outcome),
                Err(err) => PipelineEvent::failed(queued.id, &err),
            };
            events.emit_lossy(event);
        });
    }

    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Evaluation task aborted");
    }
}
