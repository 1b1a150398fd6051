//! Core data model types for StudyPulse.
//!
//! Questions generated from study material, the quiz attempts students make
//! against them, and the users who own those attempts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic recorded on an attempt whose questions span several topics.
pub const MIXED_TOPIC: &str = "Mixed";

/// Kind of question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Multiple choice: one correct option among several.
    Mcq,
    /// Free-text answer compared against a reference answer.
    Theory,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Theory => "theory",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mcq" | "multiple-choice" | "multiple_choice" | "multiplechoice"
            | "multiple choice" => Ok(QuestionType::Mcq),
            "theory" | "short_answer" | "short-answer" | "essay" | "open" => {
                Ok(QuestionType::Theory)
            }
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Question difficulty, ordered easy < medium < hard.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A validated question produced by the LLM, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// A stored question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    /// Answer options; empty for theory questions.
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub topic: String,
    pub difficulty: Difficulty,
    /// Name of the uploaded document the question came from.
    #[serde(default)]
    pub source: Option<String>,
    /// Admin who uploaded the source document.
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Materialize a draft as a new question with a fresh id.
    pub fn from_draft(
        draft: QuestionDraft,
        source: Option<String>,
        created_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        let options = match draft.kind {
            QuestionType::Mcq => draft.options,
            QuestionType::Theory => Vec::new(),
        };
        Self {
            id: Uuid::new_v4(),
            kind: draft.kind,
            question: draft.question,
            options,
            answer: draft.answer,
            explanation: draft.explanation,
            topic: draft.topic,
            difficulty: draft.difficulty,
            source,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Student-facing view of a question: the answer and explanation stay hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl From<&Question> for QuizQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            kind: q.kind,
            question: q.question.clone(),
            options: q.options.clone(),
            topic: q.topic.clone(),
            difficulty: q.difficulty,
        }
    }
}

/// Selection criteria for questions. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFilter {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<QuestionType>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        self.topic.as_deref().map_or(true, |t| question.topic == t)
            && self.kind.map_or(true, |k| question.kind == k)
            && self.difficulty.map_or(true, |d| question.difficulty == d)
    }
}

/// One answer as submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub answer: String,
}

/// The graded outcome for one question of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: Uuid,
    pub user_answer: String,
    pub is_correct: bool,
    pub correct_answer: String,
}

/// A persisted quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic: String,
    /// Percentage in `0.0..=100.0`.
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    /// Seconds the student spent on the quiz.
    pub time_spent: u64,
    pub completed: bool,
    pub answers: Vec<AnswerRecord>,
    pub created_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary {
            id: self.id,
            topic: self.topic.clone(),
            score: self.score,
            total_questions: self.total_questions,
            correct_answers: self.correct_answers,
            incorrect_answers: self.incorrect_answers,
            time_spent: self.time_spent,
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

/// An attempt without its per-question answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub id: Uuid,
    pub topic: String,
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub time_spent: u64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Question counts for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub name: String,
    pub question_count: u64,
    pub mcq_count: u64,
    pub theory_count: u64,
}

/// One page of a larger result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let limit = u64::from(limit.max(1));
        let total_pages = u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX);
        Self {
            items,
            total,
            page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question(topic: &str, kind: QuestionType, difficulty: Difficulty) -> Question {
        Question::from_draft(
            QuestionDraft {
                kind,
                question: "What is the normal adult resting heart rate?".into(),
                options: vec!["60-100 bpm".into(), "20-40 bpm".into()],
                answer: "60-100 bpm".into(),
                explanation: None,
                topic: topic.into(),
                difficulty,
            },
            Some("cardio.pdf".into()),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn question_type_display_and_parse() {
        assert_eq!(QuestionType::Mcq.to_string(), "mcq");
        assert_eq!("MCQ".parse::<QuestionType>().unwrap(), QuestionType::Mcq);
        assert_eq!(
            "multiple-choice".parse::<QuestionType>().unwrap(),
            QuestionType::Mcq
        );
        assert_eq!(
            "short_answer".parse::<QuestionType>().unwrap(),
            QuestionType::Theory
        );
        assert!("true_false".parse::<QuestionType>().is_err());
    }

    #[test]
    fn difficulty_parse_and_order() {
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert!(Difficulty::Easy < Difficulty::Medium && Difficulty::Medium < Difficulty::Hard);
    }

    #[test]
    fn theory_drafts_drop_options() {
        let q = sample_question("Cardiology", QuestionType::Theory, Difficulty::Easy);
        assert!(q.options.is_empty());
        assert_eq!(q.created_at, q.updated_at);
    }

    #[test]
    fn filter_matches_all_fields() {
        let q = sample_question("Cardiology", QuestionType::Mcq, Difficulty::Hard);
        assert!(QuestionFilter::default().matches(&q));
        let filter = QuestionFilter {
            topic: Some("Cardiology".into()),
            kind: Some(QuestionType::Mcq),
            difficulty: Some(Difficulty::Hard),
        };
        assert!(filter.matches(&q));
        let wrong = QuestionFilter {
            difficulty: Some(Difficulty::Easy),
            ..filter
        };
        assert!(!wrong.matches(&q));
    }

    #[test]
    fn quiz_view_hides_answer() {
        let q = sample_question("Cardiology", QuestionType::Mcq, Difficulty::Easy);
        let json = serde_json::to_value(QuizQuestion::from(&q)).unwrap();
        assert!(json.get("answer").is_none());
        assert_eq!(json["type"], "mcq");
        assert_eq!(json["options"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn page_counts() {
        let page = Page::new(vec![1, 2, 3], 21, 1, 10);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn question_serializes_camel_case() {
        let q = sample_question("Cardiology", QuestionType::Mcq, Difficulty::Easy);
        let json = serde_json::to_value(&q).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["source"], "cardio.pdf");
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("ÉLISE@example.com"), "élise@example.com");
    }
}
