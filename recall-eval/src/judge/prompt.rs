//! Prompt templates
//!
//! Users and generated questions are Korean, so the templates are too.

use crate::domain::SurveyQa;
use chrono::{Datelike, NaiveDate};
use std::fmt::Write;

/// Number of questions requested for the shared survey set
pub const DAILY_QUESTION_COUNT: usize = 100;

/// Number of personalized questions requested per user
pub const PERSONAL_QUESTION_COUNT: usize = 3;

/// `2026년 3월 9일`
pub fn korean_date(date: NaiveDate) -> String {
    format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
}

/// Grading rubric for one answer
pub fn score_prompt(today: NaiveDate, question: &str, answer: &str) -> String {
    format!(
        "\
당신은 회상 훈련 답변을 채점하는 평가자입니다.
오늘 날짜는 {today}입니다.
아래 질문에 대해 참여자의 답변이 얼마나 적절한지 0부터 100 사이의 정수 하나로만 답하세요.

채점 기준:
- 날짜, 시간, 숫자처럼 정답이 하나인 질문은 정확히 일치할 때만 100점이고, 조금이라도 다르면 0점에 가깝게 줍니다.
- 그 밖의 질문은 답변이 질문의 의도에 얼마나 부합하는지에 비례해 점수를 줍니다.
- 설명 없이 숫자만 출력하세요.

질문: \"{question}\"
참여자 답변: \"{answer}\"
",
        today = korean_date(today),
        question = question.trim(),
        answer = answer.trim(),
    )
}

/// Request for the shared survey question set
pub fn daily_questions_prompt() -> String {
    format!(
        "\
치매 예방 회상 치료에 쓸 설문 질문 {count}개를 만들어 주세요.
대상은 65세 이상 어르신이며, 각 질문은 본인의 지난 삶에서 있었던 일을 떠올리게 하고 분명한 정답이 있어야 합니다.

지켜야 할 점:
- 역사적 사건이나 시대 유행이 아니라 개인의 경험(다닌 학교, 결혼한 해, 자녀 수 등)을 묻습니다.
- 죽음, 질병, 경제적 어려움처럼 민감하거나 부정적인 주제는 피합니다.
- 질문 하나는 한 문장이며, 짧은 단답으로 답할 수 있어야 합니다.
- 명령형이 아닌 부드러운 말투로 씁니다. 예: \"처음 다니신 초등학교 이름은 무엇이었나요?\"
- 번호를 붙이지 말고 질문과 질문 사이는 빈 줄 하나로 구분합니다.
",
        count = DAILY_QUESTION_COUNT,
    )
}

/// Request for questions built from one user's survey answers of the day
pub fn personal_questions_prompt(answers: &[SurveyQa]) -> String {
    let mut prompt = format!(
        "\
당신은 어르신의 회상 치료를 돕는 전문가입니다.
아래는 한 사용자가 오늘 회상 설문에 남긴 질문과 답변입니다.
이 내용을 바탕으로 그분의 삶에 맞춘 회상 질문 {count}개를 만들어 주세요.

지켜야 할 점:
- 질문 하나는 한 문장입니다.
- 이름, 연도, 장소처럼 정답이 있는 질문이어야 합니다.
- 관련된 이야기를 더 꺼낼 수 있도록 부드럽게 묻습니다.
- 민감하거나 부정적인 주제는 피합니다.
- 질문만 출력하고, 질문 사이는 빈 줄 하나로 구분합니다.

입력:
",
        count = PERSONAL_QUESTION_COUNT,
    );

    for qa in answers {
        // Writing to a String cannot fail
        let _ = write!(
            prompt,
            "질문: {}\n답변: {}\n\n",
            qa.question.trim(),
            qa.answer.trim()
        );
    }

    prompt.push_str("이 분을 위한 맞춤 회상 질문을 만들어 주세요.\n");
    prompt
}
