//! recall-eval: answer evaluation service for recall-therapy questions
//!
//! Uploaded answers are stored, transcribed, scored by a judge model and
//! persisted per question domain. The library exposes every component so the
//! binary and the integration tests wire them the same way.

pub mod api;
pub mod completion;
pub mod config;
pub mod cursor;
pub mod db;
pub mod domain;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod judge;
pub mod logging;
pub mod pipeline;
pub mod router;
pub mod scheduler;
pub mod storage;
pub mod transcription;

pub use crate::error::{ApiError, ApiResult};

use crate::completion::CompletionTracker;
use crate::cursor::QuestionCursor;
use crate::pipeline::{PipelineEvent, Submission};
use axum::Router;
use chrono::{DateTime, Utc};
use recall_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub submission: Submission,
    pub cursor: QuestionCursor,
    pub completion: CompletionTracker,
    pub events: EventBus<PipelineEvent>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        submission: Submission,
        cursor: QuestionCursor,
        completion: CompletionTracker,
        events: EventBus<PipelineEvent>,
    ) -> Self {
        Self {
            submission,
            cursor,
            completion,
            events,
            startup_time: Utc::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::answer_routes())
        .merge(api::question_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
