//! recall-eval - answer evaluation service
//!
//! Loads configuration, opens the database and media store, starts the
//! evaluation worker pool and generation schedule, and serves HTTP until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use recall_common::events::EventBus;
use tokio::signal;
use tracing::{error, info, warn};

use recall_eval::completion::CompletionTracker;
use recall_eval::config::EvalConfig;
use recall_eval::cursor::QuestionCursor;
use recall_eval::generation::QuestionGenerator;
use recall_eval::ingest::{FfmpegTranscoder, MediaIngestor};
use recall_eval::judge::{GenerativeJudgeClient, Judge};
use recall_eval::pipeline::{spawn_logging_sink, EvaluationPipeline, Submission, WorkerPool};
use recall_eval::router::ResultRouter;
use recall_eval::scheduler::Scheduler;
use recall_eval::storage::{FsMediaStore, MediaStore};
use recall_eval::transcription::SpeechClient;
use recall_eval::{build_router, AppState};

/// Time allowed for the log sink to drain after the workers stop
const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "recall-eval")]
#[command(about = "Answer evaluation service for recall-therapy questions")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = recall_eval::logging::init();
    info!("Starting recall-eval v{}", env!("CARGO_PKG_VERSION"));

    let config = EvalConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    filter
        .apply(&config.logging)
        .context("Failed to apply logging configuration")?;

    let offset = config.utc_offset()?;

    info!("Database: {}", config.database_path.display());
    let pool = recall_eval::db::init_database(&config.database_path)
        .await
        .context("Failed to open database")?;

    let store: Arc<dyn MediaStore> = Arc::new(
        FsMediaStore::open(
            &config.storage.root,
            &config.storage.bucket,
            &config.storage.public_base_url,
            &config.storage.signing_secret,
        )
        .await
        .context("Failed to open media store")?,
    );
    info!("Media store: {}/{}", config.storage.root.display(), config.storage.bucket);

    let transcoder = Arc::new(FfmpegTranscoder::new(
        config.transcoder.program.clone(),
        config.transcoder.timeout(),
    ));
    let ingestor = Arc::new(MediaIngestor::new(
        Arc::clone(&store),
        transcoder,
        config.storage.prefix.clone(),
        config.transcoder.scratch_dir.clone(),
    ));

    let transcriber = Arc::new(
        SpeechClient::new(config.transcription.clone(), Arc::clone(&store))
            .context("Failed to build speech client")?,
    );
    let judge: Arc<dyn Judge> = Arc::new(
        GenerativeJudgeClient::new(&config.judge, offset).context("Failed to build judge client")?,
    );

    let router = ResultRouter::standard(pool.clone());
    let pipeline = Arc::new(EvaluationPipeline::new(
        pool.clone(),
        transcriber,
        Arc::clone(&judge),
        router.clone(),
    ));

    let events = EventBus::new(config.pipeline.event_capacity);
    let sink = spawn_logging_sink(&events);

    let workers = Arc::new(WorkerPool::start(
        pipeline,
        config.pipeline.workers,
        config.pipeline.queue_capacity,
        config.pipeline.enqueue_timeout(),
        events.clone(),
    ));

    let scheduler = if config.schedule.enabled {
        let generator = Arc::new(QuestionGenerator::new(pool.clone(), judge, router, offset));
        Some(Scheduler::new(generator, offset, config.schedule.personal_generation_hour).spawn())
    } else {
        info!("Question generation schedule disabled");
        None
    };

    let state = AppState::new(
        Submission::new(ingestor, Arc::clone(&workers)),
        QuestionCursor::new(pool.clone()).with_media_store(Arc::clone(&store)),
        CompletionTracker::new(pool, offset),
        events.clone(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    workers.shutdown().await;

    drop(workers);
    drop(events);
    if tokio::time::timeout(SINK_DRAIN_TIMEOUT, sink).await.is_err() {
        warn!("Pipeline log sink did not drain in time");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
