//! Result router
//!
//! Every persisted result is one variant of [`Record`]. The router maps each
//! variant's [`RecordKind`] to a [`Collection`] in a registry built once at
//! startup, so the pipeline's final step is the same call for every domain.

use crate::db;
use crate::domain::{Answer, Domain, NewQuestion};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    BasicAnswer(Answer),
    PersonalAnswer(Answer),
    CognitiveAnswer(Answer),
    SurveyAnswer(Answer),
    PersonalQuestion(NewQuestion),
    SurveyQuestion(NewQuestion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    BasicAnswer,
    PersonalAnswer,
    CognitiveAnswer,
    SurveyAnswer,
    PersonalQuestion,
    SurveyQuestion,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::BasicAnswer,
        RecordKind::PersonalAnswer,
        RecordKind::CognitiveAnswer,
        RecordKind::SurveyAnswer,
        RecordKind::PersonalQuestion,
        RecordKind::SurveyQuestion,
    ];

    /// Collection used by [`ResultRouter::standard`]
    pub fn default_collection(&self) -> Collection {
        match self {
            RecordKind::BasicAnswer => Collection::Answers("basic_answers"),
            RecordKind::PersonalAnswer => Collection::Answers("personal_answers"),
            RecordKind::CognitiveAnswer => Collection::Answers("cognitive_answers"),
            RecordKind::SurveyAnswer => Collection::Answers("survey_answers"),
            RecordKind::PersonalQuestion => Collection::Questions("personal_questions"),
            RecordKind::SurveyQuestion => Collection::Questions("survey_questions"),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Record {
    /// Wrap an answer in the variant owning `domain`'s answers
    pub fn answer(domain: Domain, answer: Answer) -> Self {
        match domain {
            Domain::Basic => Record::BasicAnswer(answer),
            Domain::Personal => Record::PersonalAnswer(answer),
            Domain::CognitiveAudio | Domain::CognitiveImage => Record::CognitiveAnswer(answer),
            Domain::Survey => Record::SurveyAnswer(answer),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::BasicAnswer(_) => RecordKind::BasicAnswer,
            Record::PersonalAnswer(_) => RecordKind::PersonalAnswer,
            Record::CognitiveAnswer(_) => RecordKind::CognitiveAnswer,
            Record::SurveyAnswer(_) => RecordKind::SurveyAnswer,
            Record::PersonalQuestion(_) => RecordKind::PersonalQuestion,
            Record::SurveyQuestion(_) => RecordKind::SurveyQuestion,
        }
    }
}

/// Table a record kind is appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Answers(&'static str),
    Questions(&'static str),
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Answers(table) | Collection::Questions(table) => table,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    /// No collection registered for the record's kind
    #[error("Unsupported record type: {0}")]
    UnsupportedRecordType(RecordKind),

    #[error("{kind} cannot be stored in collection '{table}'")]
    CollectionMismatch { kind: RecordKind, table: &'static str },

    #[error("Duplicate record in '{0}'")]
    Duplicate(&'static str),

    #[error(transparent)]
    Database(recall_common::Error),
}

impl PersistError {
    fn from_db(table: &'static str, err: recall_common::Error) -> Self {
        if err.is_unique_violation() {
            PersistError::Duplicate(table)
        } else {
            PersistError::Database(err)
        }
    }
}

#[derive(Clone)]
pub struct ResultRouter {
    pool: SqlitePool,
    registry: HashMap<RecordKind, Collection>,
}

pub struct ResultRouterBuilder {
    pool: SqlitePool,
    registry: HashMap<RecordKind, Collection>,
}

impl ResultRouterBuilder {
    /// Route `kind` to `collection`, replacing any earlier registration
    pub fn register(mut self, kind: RecordKind, collection: Collection) -> Self {
        self.registry.insert(kind, collection);
        self
    }

    pub fn build(self) -> ResultRouter {
        ResultRouter {
            pool: self.pool,
            registry: self.registry,
        }
    }
}

impl ResultRouter {
    pub fn builder(pool: SqlitePool) -> ResultRouterBuilder {
        ResultRouterBuilder {
            pool,
            registry: HashMap::new(),
        }
    }

    /// Router with every record kind registered to its default collection
    pub fn standard(pool: SqlitePool) -> Self {
        RecordKind::ALL
            .into_iter()
            .fold(Self::builder(pool), |builder, kind| {
                builder.register(kind, kind.default_collection())
            })
            .build()
    }

    pub fn is_registered(&self, kind: RecordKind) -> bool {
        self.registry.contains_key(&kind)
    }

    /// Append `record` to its registered collection, returning the new row id
    pub async fn save(&self, record: &Record) -> Result<i64, PersistError> {
        let kind = record.kind();
        let collection = *self
            .registry
            .get(&kind)
            .ok_or(PersistError::UnsupportedRecordType(kind))?;

        let id = match (collection, record) {
            (
                Collection::Answers(table),
                Record::BasicAnswer(answer)
                | Record::PersonalAnswer(answer)
                | Record::CognitiveAnswer(answer)
                | Record::SurveyAnswer(answer),
            ) => db::answers::insert_answer(&self.pool, table, answer)
                .await
                .map_err(|e| PersistError::from_db(table, e))?,
            (
                Collection::Questions(table),
                Record::PersonalQuestion(question) | Record::SurveyQuestion(question),
            ) => db::questions::insert_question(&self.pool, table, question)
                .await
                .map_err(|e| PersistError::from_db(table, e))?,
            (collection, _) => {
                return Err(PersistError::CollectionMismatch {
                    kind,
                    table: collection.table(),
                })
            }
        };

        debug!(kind = %kind, table = collection.table(), id, "Persisted record");
        Ok(id)
    }
}
