//! Grading of quiz submissions.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StudyError;
use crate::model::{AnswerRecord, Question, QuestionType, SubmittedAnswer};

/// Default share of reference keywords a theory answer must recall.
pub const DEFAULT_THEORY_MATCH_THRESHOLD: f64 = 0.6;

/// Minimum length of a reference token to count as a keyword.
const MIN_KEYWORD_LEN: usize = 4;

const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "among", "been", "before", "being", "between", "both", "can",
    "could", "does", "each", "from", "have", "into", "more", "most", "must", "only", "other",
    "over", "should", "some", "such", "than", "that", "their", "them", "then", "there", "these",
    "they", "this", "those", "through", "under", "very", "were", "what", "when", "where",
    "which", "while", "will", "with", "would", "your",
];

/// Grading options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub theory_match_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            theory_match_threshold: DEFAULT_THEORY_MATCH_THRESHOLD,
        }
    }
}

/// Graded result of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// Id of the persisted attempt, once stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Uuid>,
    /// Percentage in `0.0..=100.0`.
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub time_spent: u64,
    /// Per-question outcomes in submission order.
    #[serde(rename = "questions")]
    pub results: Vec<AnswerRecord>,
}

/// Check the shape of a submission before any question is loaded.
///
/// Returns the parsed question ids in submission order.
pub fn validate_submission(
    answers: &[SubmittedAnswer],
    time_spent: i64,
) -> Result<Vec<Uuid>, StudyError> {
    if answers.is_empty() {
        return Err(StudyError::Validation("No answers provided".into()));
    }
    if time_spent < 0 {
        return Err(StudyError::Validation("Invalid time spent".into()));
    }

    let mut seen = HashSet::with_capacity(answers.len());
    let mut ids = Vec::with_capacity(answers.len());
    for a in answers {
        if a.answer.trim().is_empty() {
            return Err(StudyError::Validation("Invalid answer format".into()));
        }
        let id = Uuid::parse_str(a.question_id.trim())
            .map_err(|_| StudyError::Validation("Invalid answer format".into()))?;
        if !seen.insert(id) {
            return Err(StudyError::Validation(
                "Duplicate question in submission".into(),
            ));
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Grade a submission against the stored questions.
pub fn score_submission(
    questions: &HashMap<Uuid, Question>,
    answers: &[SubmittedAnswer],
    time_spent: i64,
    config: &ScoringConfig,
) -> Result<QuizResult, StudyError> {
    let ids = validate_submission(answers, time_spent)?;
    score_validated(questions, &ids, answers, time_spent, config)
}

/// Grade a submission whose ids came from [`validate_submission`].
pub fn score_validated(
    questions: &HashMap<Uuid, Question>,
    ids: &[Uuid],
    answers: &[SubmittedAnswer],
    time_spent: i64,
    config: &ScoringConfig,
) -> Result<QuizResult, StudyError> {
    if ids.iter().any(|id| !questions.contains_key(id)) {
        return Err(StudyError::NotFound("Some questions were not found".into()));
    }

    let mut results = Vec::with_capacity(answers.len());
    for (id, submitted) in ids.iter().zip(answers) {
        let Some(question) = questions.get(id) else {
            continue;
        };
        let given = submitted.answer.trim();
        results.push(AnswerRecord {
            question_id: *id,
            user_answer: given.to_string(),
            is_correct: grade_answer(question, given, config),
            correct_answer: question.answer.clone(),
        });
    }

    let total = results.len() as u32;
    let correct = results.iter().filter(|r| r.is_correct).count() as u32;
    Ok(QuizResult {
        attempt_id: None,
        score: percentage(correct, total),
        total_questions: total,
        correct_answers: correct,
        incorrect_answers: total - correct,
        time_spent: time_spent.unsigned_abs(),
        results,
    })
}

/// Decide whether `given` answers `question` correctly.
pub fn grade_answer(question: &Question, given: &str, config: &ScoringConfig) -> bool {
    match question.kind {
        QuestionType::Mcq => grade_mcq(question, given),
        QuestionType::Theory => grade_theory(&question.answer, given, config.theory_match_threshold),
    }
}

/// `correct / total * 100`, zero when there is nothing to grade.
pub fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(total) * 100.0
    }
}

fn grade_mcq(question: &Question, given: &str) -> bool {
    let expected = resolve_option(&question.options, &question.answer);
    let given = resolve_option(&question.options, given);
    !given.is_empty() && given.to_lowercase() == expected.to_lowercase()
}

/// Map an option letter (`B`, `b)`, `C.`) to its option text.
///
/// An answer that already names an option is taken as that option.
fn resolve_option<'a>(options: &'a [String], answer: &'a str) -> &'a str {
    let answer = answer.trim();
    if let Some(option) = options.iter().find(|o| o.trim().eq_ignore_ascii_case(answer)) {
        return option.trim();
    }
    option_index(answer)
        .and_then(|i| options.get(i))
        .map(|o| o.trim())
        .unwrap_or(answer)
}

fn option_index(answer: &str) -> Option<usize> {
    let letter = answer.trim_end_matches([')', '.', ':']);
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some(usize::from(c.to_ascii_lowercase() as u8 - b'a'))
        }
        _ => None,
    }
}

fn grade_theory(reference: &str, given: &str, threshold: f64) -> bool {
    let reference = normalize(reference);
    let given = normalize(given);
    if given.is_empty() {
        return false;
    }
    if reference == given {
        return true;
    }

    let keywords: HashSet<&str> = reference
        .split(' ')
        .filter(|t| t.chars().count() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(t))
        .collect();
    if keywords.is_empty() {
        return false;
    }

    let given_tokens: HashSet<&str> = given.split(' ').collect();
    let recalled = keywords.iter().filter(|k| given_tokens.contains(*k)).count();
    recalled as f64 / keywords.len() as f64 >= threshold
}

/// Lowercase, turn non-alphanumerics into spaces and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}
