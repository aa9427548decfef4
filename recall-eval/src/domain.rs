//! Question domains, media kinds and the records that flow through the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum score counted as a match
pub const MATCH_THRESHOLD: u8 = 70;

/// Unrecognized domain or media kind string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {what} '{value}'")]
pub struct ParseKindError {
    what: &'static str,
    value: String,
}

/// Question category sharing the evaluation pipeline shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    Basic,
    Personal,
    CognitiveAudio,
    CognitiveImage,
    Survey,
}

/// Static per-domain behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainPolicy {
    /// Storage folder for uploaded answers
    pub folder: &'static str,
    pub question_table: &'static str,
    pub answer_table: &'static str,
    /// Rows in shared cognitive tables are told apart by media type
    pub media_filter: Option<MediaKind>,
    /// Questions belong to a single user
    pub owned_questions: bool,
    /// Answers are sent to the judge
    pub scored: bool,
    pub default_kind: MediaKind,
}

const BASIC: DomainPolicy = DomainPolicy {
    folder: "basic",
    question_table: "basic_questions",
    answer_table: "basic_answers",
    media_filter: None,
    owned_questions: false,
    scored: true,
    default_kind: MediaKind::Audio,
};

const PERSONAL: DomainPolicy = DomainPolicy {
    folder: "personal",
    question_table: "personal_questions",
    answer_table: "personal_answers",
    media_filter: None,
    owned_questions: true,
    scored: true,
    default_kind: MediaKind::Audio,
};

const COGNITIVE_AUDIO: DomainPolicy = DomainPolicy {
    folder: "cognitive-sound",
    question_table: "cognitive_questions",
    answer_table: "cognitive_answers",
    media_filter: Some(MediaKind::Audio),
    owned_questions: false,
    scored: true,
    default_kind: MediaKind::Audio,
};

const COGNITIVE_IMAGE: DomainPolicy = DomainPolicy {
    folder: "cognitive-image",
    question_table: "cognitive_questions",
    answer_table: "cognitive_answers",
    media_filter: Some(MediaKind::Image),
    owned_questions: false,
    scored: true,
    default_kind: MediaKind::Image,
};

const SURVEY: DomainPolicy = DomainPolicy {
    folder: "survey",
    question_table: "survey_questions",
    answer_table: "survey_answers",
    media_filter: None,
    owned_questions: false,
    scored: false,
    default_kind: MediaKind::Audio,
};

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Basic,
        Domain::Personal,
        Domain::CognitiveAudio,
        Domain::CognitiveImage,
        Domain::Survey,
    ];

    pub fn policy(&self) -> &'static DomainPolicy {
        match self {
            Domain::Basic => &BASIC,
            Domain::Personal => &PERSONAL,
            Domain::CognitiveAudio => &COGNITIVE_AUDIO,
            Domain::CognitiveImage => &COGNITIVE_IMAGE,
            Domain::Survey => &SURVEY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Basic => "basic",
            Domain::Personal => "personal",
            Domain::CognitiveAudio => "cognitive-audio",
            Domain::CognitiveImage => "cognitive-image",
            Domain::Survey => "survey",
        }
    }

    /// Whether a submission of `kind` makes sense for this domain
    ///
    /// Image answers only belong to the cognitive-image domain, which in turn
    /// takes nothing else.
    pub fn accepts(&self, kind: MediaKind) -> bool {
        match self {
            Domain::CognitiveImage => kind == MediaKind::Image,
            _ => kind != MediaKind::Image,
        }
    }

    /// Media type tag stored on this domain's answers
    pub fn answer_media_kind(&self, submitted: MediaKind) -> MediaKind {
        self.policy().media_filter.unwrap_or(submitted)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseKindError {
                what: "domain",
                value: s.to_string(),
            })
    }
}

/// Kind of media carried by an answer or a question reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Recorded speech, normalized before transcription
    Audio,
    /// Picture answer, never transcribed
    Image,
    /// Stored as uploaded and transcribed directly
    Raw,
}

/// Static per-kind behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPolicy {
    pub transcode: bool,
    pub transcribe: bool,
    /// Content type used when presigning a question's media reference
    pub question_content_type: &'static str,
}

impl MediaKind {
    pub fn policy(&self) -> MediaPolicy {
        match self {
            MediaKind::Audio => MediaPolicy {
                transcode: true,
                transcribe: true,
                question_content_type: "audio/mpeg",
            },
            MediaKind::Image => MediaPolicy {
                transcode: false,
                transcribe: false,
                question_content_type: "image/jpeg",
            },
            MediaKind::Raw => MediaPolicy {
                transcode: false,
                transcribe: true,
                question_content_type: "application/octet-stream",
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
            MediaKind::Raw => "raw",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(MediaKind::Audio),
            "image" => Ok(MediaKind::Image),
            "raw" => Ok(MediaKind::Raw),
            _ => Err(ParseKindError {
                what: "media kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Judge-assigned score in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub fn new(value: u32) -> Option<Self> {
        (value <= 100).then(|| Score(value as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_match(&self) -> bool {
        self.0 >= MATCH_THRESHOLD
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: i64,
    /// Owner, only for personal questions
    pub user_id: Option<i64>,
    pub content: String,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub created_at: DateTime<Utc>,
}

/// Question not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub user_id: Option<i64>,
    pub content: String,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub created_at: DateTime<Utc>,
}

impl NewQuestion {
    pub fn text(content: impl Into<String>, user_id: Option<i64>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            content: content.into(),
            media_url: None,
            media_kind: None,
            created_at,
        }
    }
}

/// Everything an answer carries apart from its grade
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerInput {
    pub question_id: i64,
    pub user_id: i64,
    pub answer_text: String,
    pub media_path: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub created_at: DateTime<Utc>,
}

/// Answer ready to persist
///
/// The match flag is derived from the score at construction and cannot be set
/// on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    input: AnswerInput,
    score: Option<Score>,
    is_match: bool,
}

impl Answer {
    pub fn graded(input: AnswerInput, score: Score) -> Self {
        Self {
            input,
            score: Some(score),
            is_match: score.is_match(),
        }
    }

    /// Survey answers are kept without a score
    pub fn ungraded(input: AnswerInput) -> Self {
        Self {
            input,
            score: None,
            is_match: false,
        }
    }

    pub fn question_id(&self) -> i64 {
        self.input.question_id
    }

    pub fn user_id(&self) -> i64 {
        self.input.user_id
    }

    pub fn answer_text(&self) -> &str {
        &self.input.answer_text
    }

    pub fn score(&self) -> Option<Score> {
        self.score
    }

    pub fn is_match(&self) -> bool {
        self.is_match
    }

    pub fn media_path(&self) -> Option<&str> {
        self.input.media_path.as_deref()
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.input.media_kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.input.created_at
    }
}

/// One survey question with the user's answer, input to personalization
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyQa {
    pub question_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}
