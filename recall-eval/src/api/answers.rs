//! Answer submission and completion endpoints
//!
//! POST /answers/:domain (multipart), GET /answers/:domain/completed

use super::{parse_domain, user_id, UserQuery};
use crate::domain::MediaKind;
use crate::error::{ApiError, ApiResult};
use crate::ingest::Upload;
use crate::AppState;
use axum::extract::multipart::Field;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::debug;

/// Largest accepted multipart body
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub storage_key: String,
}

#[derive(Debug, Serialize)]
pub struct CompletedResponse {
    pub completed: bool,
}

/// Fields of a submission form
#[derive(Debug, Default)]
struct SubmissionForm {
    question_id: Option<i64>,
    user_id: Option<i64>,
    media_kind: Option<MediaKind>,
    upload: Option<Upload>,
}

async fn field_text(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn parse_id(name: &str, value: &str) -> ApiResult<i64> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{} must be an integer, got '{}'", name, value)))
}

async fn read_form(mut multipart: Multipart) -> ApiResult<SubmissionForm> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "question_id" => form.question_id = Some(parse_id(&name, &field_text(field).await?)?),
            "user_id" => form.user_id = Some(parse_id(&name, &field_text(field).await?)?),
            "media_kind" => {
                let value = field_text(field).await?;
                if !value.is_empty() {
                    form.media_kind = Some(value.parse().map_err(|e| ApiError::BadRequest(format!("{}", e)))?);
                }
            }
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                form.upload = Some(Upload::new(filename, bytes.to_vec()));
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// POST /answers/:domain
///
/// Stores the upload and queues its evaluation. The response only confirms
/// the upload; the score is persisted later.
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let domain = parse_domain(&domain)?;
    let form = read_form(multipart).await?;

    let question_id = form
        .question_id
        .ok_or_else(|| ApiError::BadRequest("missing field 'question_id'".to_string()))?;
    let user_id = form
        .user_id
        .ok_or_else(|| ApiError::BadRequest("missing field 'user_id'".to_string()))?;
    let upload = form
        .upload
        .ok_or_else(|| ApiError::BadRequest("missing field 'file'".to_string()))?;

    let storage_key = state
        .submission
        .submit(domain, question_id, user_id, upload, form.media_kind)
        .await?;

    Ok(Json(SubmitResponse { storage_key }))
}

/// GET /answers/:domain/completed?user_id=
pub async fn completed_today(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<CompletedResponse>> {
    let domain = parse_domain(&domain)?;
    let user_id = user_id(query)?;

    let completed = state.completion.is_completed_today(user_id, domain).await?;
    Ok(Json(CompletedResponse { completed }))
}

pub fn answer_routes() -> Router<AppState> {
    let upload = Router::new()
        .route("/answers/:domain", post(submit_answer))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/answers/:domain/completed", get(completed_today))
        .merge(upload)
}
