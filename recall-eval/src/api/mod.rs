//! HTTP surface consumed by the outer API layer
//!
//! No authentication happens here; callers are trusted services.

pub mod answers;
pub mod health;
pub mod questions;

pub use answers::answer_routes;
pub use health::health_routes;
pub use questions::question_routes;

use crate::domain::Domain;
use crate::error::ApiError;
use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use serde::Deserialize;

/// `?user_id=` query shared by the read endpoints
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}

fn parse_domain(value: &str) -> Result<Domain, ApiError> {
    value.parse().map_err(|e| ApiError::NotFound(format!("{}", e)))
}

fn user_id(query: Result<Query<UserQuery>, QueryRejection>) -> Result<i64, ApiError> {
    query
        .map(|Query(q)| q.user_id)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}
