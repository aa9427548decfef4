//! HTTP client for a `generateContent`-style generative-language API

use super::{parse, prompt, EvaluationError, Judge};
use crate::config::JudgeConfig;
use crate::domain::{Score, SurveyQa};
use async_trait::async_trait;
use chrono::FixedOffset;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("recall-eval/", env!("CARGO_PKG_VERSION"));

pub struct GenerativeJudgeClient {
    http_client: reqwest::Client,
    /// Requests per minute allowed against the backend
    rate_limiter: DefaultDirectRateLimiter,
    endpoint: String,
    api_key: String,
    utc_offset: FixedOffset,
}

impl GenerativeJudgeClient {
    pub fn new(config: &JudgeConfig, utc_offset: FixedOffset) -> Result<Self, EvaluationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| EvaluationError::Configuration(e.to_string()))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            EvaluationError::Configuration("requests_per_minute must be non-zero".to_string())
        })?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            endpoint: format!(
                "{}/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
            utc_offset,
        })
    }

    /// Send one prompt and return the first candidate's text
    async fn generate(&self, prompt: &str) -> Result<String, EvaluationError> {
        self.rate_limiter.until_ready().await;

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!(prompt_chars = prompt.chars().count(), "Calling judge backend");

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Api(status.as_u16(), error_text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| EvaluationError::MalformedResponse(e.to_string()))?;

        candidate_text(&json)
    }
}

/// `candidates[0].content.parts[0].text`
pub(crate) fn candidate_text(json: &Value) -> Result<String, EvaluationError> {
    json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            EvaluationError::MalformedResponse("missing candidates[0].content.parts[0].text".to_string())
        })
}

#[async_trait]
impl Judge for GenerativeJudgeClient {
    async fn score(&self, question: &str, answer: &str) -> Result<Score, EvaluationError> {
        let today = recall_common::time::local_date(recall_common::time::now(), &self.utc_offset);
        let text = self.generate(&prompt::score_prompt(today, question, answer)).await?;
        let score = parse::parse_score(&text)?;
        debug!(score = score.value(), "Judge scored answer");
        Ok(score)
    }

    async fn generate_daily_questions(&self) -> Result<Vec<String>, EvaluationError> {
        let text = self.generate(&prompt::daily_questions_prompt()).await?;
        let questions = parse::split_questions(&text);
        info!(count = questions.len(), "Generated survey questions");
        Ok(questions)
    }

    async fn generate_personal_questions(&self, answers: &[SurveyQa]) -> Result<Vec<String>, EvaluationError> {
        let text = self
            .generate(&prompt::personal_questions_prompt(answers))
            .await?;
        let questions = parse::split_questions(&text);
        info!(count = questions.len(), inputs = answers.len(), "Generated personal questions");
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text_extracts_first_part() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": " 85 \n" }, { "text": "ignored" }] } },
                { "content": { "parts": [{ "text": "12" }] } }
            ]
        });
        assert_eq!(candidate_text(&body).unwrap(), "85");
    }

    #[test]
    fn test_candidate_text_missing_is_malformed() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": 85 }] } }] }),
        ] {
            assert!(matches!(
                candidate_text(&body),
                Err(EvaluationError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = JudgeConfig {
            requests_per_minute: 0,
            ..JudgeConfig::default()
        };
        let offset = FixedOffset::east_opt(0).unwrap();
        assert!(matches!(
            GenerativeJudgeClient::new(&config, offset),
            Err(EvaluationError::Configuration(_))
        ));
    }
}
