//! Parsers for free-form judge output

use super::EvaluationError;
use crate::domain::Score;

/// Extract a score by discarding every non-digit character
///
/// `"The score is 85 points."` parses as 85. Text with no digits is
/// `Unparseable`; anything above 100 (including `"85/100"`, which collapses
/// to 85100) is `OutOfRange`.
pub fn parse_score(text: &str) -> Result<Score, EvaluationError> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(EvaluationError::Unparseable(text.trim().to_string()));
    }

    digits
        .parse::<u32>()
        .ok()
        .and_then(Score::new)
        .ok_or_else(|| EvaluationError::OutOfRange(text.trim().to_string()))
}

/// Split generated text into questions at blank lines
pub fn split_questions(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}
