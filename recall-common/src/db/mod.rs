//! Database schema and connection setup

pub mod init;

pub use init::{create_schema, init_database, init_memory_database};

/// Question tables, one per question family
pub const QUESTION_TABLES: [&str; 4] = [
    "basic_questions",
    "personal_questions",
    "cognitive_questions",
    "survey_questions",
];

/// Answer tables paired with the question table they reference
pub const ANSWER_TABLES: [(&str, &str); 4] = [
    ("basic_answers", "basic_questions"),
    ("personal_answers", "personal_questions"),
    ("cognitive_answers", "cognitive_questions"),
    ("survey_answers", "survey_questions"),
];
