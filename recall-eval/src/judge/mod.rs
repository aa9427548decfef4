//! Generative-language judge
//!
//! One backend serves two purposes: grading a transcript against its
//! question, and generating new question sets. Both follow the same shape of
//! templated prompt, single candidate text, pure parser.

mod client;
pub mod parse;
pub mod prompt;

pub use client::GenerativeJudgeClient;

use crate::domain::{Score, SurveyQa};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Judge client configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Judge backend timed out")]
    Timeout,

    #[error("Judge backend error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed judge response: {0}")]
    MalformedResponse(String),

    #[error("No score in judge response '{0}'")]
    Unparseable(String),

    #[error("Score out of range in judge response '{0}'")]
    OutOfRange(String),
}

impl From<reqwest::Error> for EvaluationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EvaluationError::Timeout
        } else {
            EvaluationError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait Judge: Send + Sync {
    /// Score how well `answer` answers `question`
    async fn score(&self, question: &str, answer: &str) -> Result<Score, EvaluationError>;

    /// Question set for the shared daily survey
    async fn generate_daily_questions(&self) -> Result<Vec<String>, EvaluationError>;

    /// Questions tailored to one user's survey answers
    async fn generate_personal_questions(&self, answers: &[SurveyQa]) -> Result<Vec<String>, EvaluationError>;
}
