//! GET /questions/:domain/next

use super::{parse_domain, user_id, UserQuery};
use crate::domain::Question;
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct NextQuestionsResponse {
    pub questions: Vec<Question>,
}

pub async fn next_questions(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<NextQuestionsResponse>> {
    let domain = parse_domain(&domain)?;
    let user_id = user_id(query)?;

    let questions = state.cursor.next_questions(user_id, domain).await?;
    Ok(Json(NextQuestionsResponse { questions }))
}

pub fn question_routes() -> Router<AppState> {
    Router::new().route("/questions/:domain/next", get(next_questions))
}
