//! Quiz analytics computed from a student's attempts.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AttemptSummary, Difficulty, Question, QuizAttempt};
use crate::scoring::percentage;

/// Number of recent attempts reported by default.
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Aggregate performance for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalytics {
    pub total_attempts: u64,
    pub average_score: f64,
    pub highest_score: f64,
    pub total_questions_answered: u64,
    pub total_correct_answers: u64,
    /// Correct answers over answered questions, as a percentage.
    pub accuracy: f64,
    pub recent_attempts: Vec<AttemptSummary>,
    pub topic_performance: Vec<TopicPerformance>,
    pub difficulty_performance: Vec<DifficultyPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPerformance {
    pub topic: String,
    pub average_score: f64,
    pub total_attempts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyPerformance {
    pub difficulty: Difficulty,
    pub average_score: f64,
    pub total_attempts: u64,
}

/// How often one question was answered correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_id: Uuid,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub success_rate: f64,
}

/// Everything the analytics endpoint returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub quiz_analytics: QuizAnalytics,
    pub question_analytics: Vec<QuestionAnalytics>,
}

#[derive(Default)]
struct Tally {
    answered: u32,
    correct: u32,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.answered += 1;
        if correct {
            self.correct += 1;
        }
    }
}

/// Summarize a student's attempts.
///
/// `attempts` must be ordered newest first. Answers whose question has since
/// been deleted count toward totals but not toward topic or difficulty
/// performance.
pub fn compute_quiz_analytics(
    attempts: &[QuizAttempt],
    questions: &HashMap<Uuid, Question>,
    recent_limit: usize,
) -> QuizAnalytics {
    if attempts.is_empty() {
        return QuizAnalytics::default();
    }

    let total_attempts = attempts.len() as u64;
    let score_sum: f64 = attempts.iter().map(|a| a.score).sum();
    let highest_score = attempts.iter().map(|a| a.score).fold(0.0, f64::max);
    let total_questions_answered: u64 = attempts.iter().map(|a| u64::from(a.total_questions)).sum();
    let total_correct_answers: u64 = attempts.iter().map(|a| u64::from(a.correct_answers)).sum();
    let accuracy = if total_questions_answered == 0 {
        0.0
    } else {
        total_correct_answers as f64 / total_questions_answered as f64 * 100.0
    };

    let mut by_topic: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, Tally> = BTreeMap::new();
    for answer in attempts.iter().flat_map(|a| &a.answers) {
        let Some(question) = questions.get(&answer.question_id) else {
            continue;
        };
        by_topic
            .entry(question.topic.as_str())
            .or_default()
            .record(answer.is_correct);
        by_difficulty
            .entry(question.difficulty)
            .or_default()
            .record(answer.is_correct);
    }

    QuizAnalytics {
        total_attempts,
        average_score: score_sum / total_attempts as f64,
        highest_score,
        total_questions_answered,
        total_correct_answers,
        accuracy,
        recent_attempts: attempts.iter().take(recent_limit).map(QuizAttempt::summary).collect(),
        topic_performance: by_topic
            .into_iter()
            .map(|(topic, t)| TopicPerformance {
                topic: topic.to_string(),
                average_score: percentage(t.correct, t.answered),
                total_attempts: u64::from(t.answered),
            })
            .collect(),
        difficulty_performance: by_difficulty
            .into_iter()
            .map(|(difficulty, t)| DifficultyPerformance {
                difficulty,
                average_score: percentage(t.correct, t.answered),
                total_attempts: u64::from(t.answered),
            })
            .collect(),
    }
}

/// Per-question success rates across all attempts, sorted by question id.
pub fn compute_question_analytics(attempts: &[QuizAttempt]) -> Vec<QuestionAnalytics> {
    let mut stats: BTreeMap<Uuid, Tally> = BTreeMap::new();
    for answer in attempts.iter().flat_map(|a| &a.answers) {
        stats
            .entry(answer.question_id)
            .or_default()
            .record(answer.is_correct);
    }

    stats
        .into_iter()
        .map(|(question_id, t)| QuestionAnalytics {
            question_id,
            total_attempts: t.answered,
            correct_attempts: t.correct,
            success_rate: percentage(t.correct, t.answered),
        })
        .collect()
}
