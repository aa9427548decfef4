//! Shared fixtures for recall-eval integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recall_eval::db;
use recall_eval::domain::{Domain, NewQuestion, Score, SurveyQa};
use recall_eval::ingest::{IngestError, Transcoder};
use recall_eval::judge::{EvaluationError, Judge};
use recall_eval::storage::FsMediaStore;
use recall_eval::transcription::{Transcriber, TranscriptionError};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub async fn memory_pool() -> SqlitePool {
    db::init_memory_database().await.expect("Failed to create in-memory database")
}

/// Insert `count` text questions into `domain`, returning their ids
pub async fn seed_questions(pool: &SqlitePool, domain: Domain, owner: Option<i64>, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        let mut question = NewQuestion::text(format!("{} question {}", domain, n + 1), owner, Utc::now());
        question.media_kind = domain.policy().media_filter;
        let id = db::questions::insert_question(pool, domain.policy().question_table, &question)
            .await
            .expect("Failed to insert question");
        ids.push(id);
    }
    ids
}

pub async fn temp_store(dir: &Path) -> Arc<FsMediaStore> {
    Arc::new(
        FsMediaStore::open(dir, "recall-media", "http://media.test", "test-secret")
            .await
            .expect("Failed to open media store"),
    )
}

/// Transcriber returning a fixed text, or `EmptyText` when `None`
pub struct StubTranscriber {
    text: Option<String>,
    pub calls: AtomicUsize,
    pub keys: Mutex<Vec<String>>,
}

impl StubTranscriber {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, storage_key: &str) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(storage_key.to_string());
        self.text.clone().ok_or(TranscriptionError::EmptyText)
    }
}

/// Judge with canned answers
///
/// With a gate, every `score` call waits for a permit first so tests can hold
/// jobs in flight.
pub struct StubJudge {
    score: Option<u32>,
    questions: Vec<String>,
    gate: Option<Arc<Semaphore>>,
    pub score_calls: AtomicUsize,
    pub answers_seen: Mutex<Vec<String>>,
    pub survey_inputs: Mutex<Vec<Vec<SurveyQa>>>,
}

impl StubJudge {
    pub fn scoring(score: u32) -> Self {
        Self {
            score: Some(score),
            questions: Vec::new(),
            gate: None,
            score_calls: AtomicUsize::new(0),
            answers_seen: Mutex::new(Vec::new()),
            survey_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Judge whose backend always fails
    pub fn failing() -> Self {
        Self {
            score: None,
            ..Self::scoring(0)
        }
    }

    pub fn generating(questions: &[&str]) -> Self {
        Self {
            questions: questions.iter().map(|q| q.to_string()).collect(),
            ..Self::scoring(0)
        }
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn score_count(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Judge for StubJudge {
    async fn score(&self, _question: &str, answer: &str) -> Result<Score, EvaluationError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        self.answers_seen.lock().unwrap().push(answer.to_string());

        let value = self
            .score
            .ok_or_else(|| EvaluationError::Api(503, "backend down".to_string()))?;
        Score::new(value).ok_or_else(|| EvaluationError::OutOfRange(value.to_string()))
    }

    async fn generate_daily_questions(&self) -> Result<Vec<String>, EvaluationError> {
        if self.score.is_none() {
            return Err(EvaluationError::Api(503, "backend down".to_string()));
        }
        Ok(self.questions.clone())
    }

    async fn generate_personal_questions(&self, answers: &[SurveyQa]) -> Result<Vec<String>, EvaluationError> {
        self.survey_inputs.lock().unwrap().push(answers.to_vec());
        if self.score.is_none() {
            return Err(EvaluationError::Api(503, "backend down".to_string()));
        }
        Ok(self.questions.clone())
    }
}

/// Transcoder that copies its input, or fails with a fixed message
pub struct StubTranscoder {
    fail: Option<String>,
    pub calls: AtomicUsize,
}

impl StubTranscoder {
    pub fn copying() -> Arc<Self> {
        Arc::new(Self {
            fail: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail {
            return Err(IngestError::Transcode(message.clone()));
        }
        let mut bytes = b"RIFF".to_vec();
        bytes.extend(tokio::fs::read(input).await?);
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

/// Instant at `h:m:s.ms` on the given day in +09:00
pub fn kst(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<Utc> {
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    let naive = NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_milli_opt(h, mi, s, ms)
        .unwrap();
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .from_local_datetime(&naive)
        .unwrap()
        .with_timezone(&Utc)
}
