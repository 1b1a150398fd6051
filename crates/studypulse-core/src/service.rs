//! `StudyService`: the operations the HTTP API and CLI are built on.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::StudyError;
use crate::generation::QuestionGenerator;
use crate::model::{
    AttemptSummary, Page, Question, QuestionFilter, QuestionType, QuizAttempt, QuizQuestion, Role,
    SubmittedAnswer, TopicSummary, MIXED_TOPIC,
};
use crate::pdf::{DocumentError, DocumentExtractor};
use crate::scoring::{score_validated, validate_submission, QuizResult, ScoringConfig};
use crate::statistics::{compute_question_analytics, compute_quiz_analytics, AnalyticsReport};
use crate::store::{Storage, StorageError};

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Quiz-related knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    /// Questions per quiz when the caller does not ask for a count.
    pub default_count: usize,
    pub max_count: usize,
    pub theory_match_threshold: f64,
    /// Attempts listed under `recentAttempts` in analytics.
    pub recent_window: usize,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            default_count: 10,
            max_count: 50,
            theory_match_threshold: crate::scoring::DEFAULT_THEORY_MATCH_THRESHOLD,
            recent_window: crate::statistics::DEFAULT_RECENT_WINDOW,
        }
    }
}

/// Outcome of ingesting one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub questions_count: usize,
    pub chunks_processed: usize,
    pub chunks_skipped: usize,
    pub rejected: usize,
}

#[derive(Clone)]
pub struct StudyService {
    storage: Storage,
    extractor: Arc<dyn DocumentExtractor>,
    generator: Arc<QuestionGenerator>,
    settings: QuizSettings,
}

impl StudyService {
    pub fn new(
        storage: Storage,
        extractor: Arc<dyn DocumentExtractor>,
        generator: QuestionGenerator,
        settings: QuizSettings,
    ) -> Self {
        Self {
            storage,
            extractor,
            generator: Arc::new(generator),
            settings,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Extract text from an uploaded PDF, generate questions and store them.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn ingest_document(
        &self,
        bytes: Vec<u8>,
        source: &str,
        admin_id: Uuid,
    ) -> Result<IngestReport, StudyError> {
        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| DocumentError::Extraction(format!("text extraction task failed: {e}")))??;
        info!(chars = text.len(), "extracted document text");

        let report = self
            .generator
            .generate(&text)
            .await
            .map_err(|e| StudyError::Generation(format!("{e:#}")))?;

        let now = Utc::now();
        let questions: Vec<Question> = report
            .questions
            .into_iter()
            .map(|draft| Question::from_draft(draft, Some(source.to_string()), Some(admin_id), now))
            .collect();
        if questions.is_empty() {
            warn!("no usable questions generated from document");
        } else {
            self.storage.questions.insert_many(&questions).await?;
        }

        info!(questions = questions.len(), "document ingested");
        Ok(IngestReport {
            questions_count: questions.len(),
            chunks_processed: report.chunks_total,
            chunks_skipped: report.chunks_skipped,
            rejected: report.rejected,
        })
    }

    /// One page of questions, newest first.
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<Question>, StudyError> {
        let (page, limit) = paging(page, limit);
        let offset = u64::from(page - 1) * u64::from(limit);
        let total = self.storage.questions.count(filter).await?;
        let items = self
            .storage
            .questions
            .list(filter, offset, u64::from(limit))
            .await?;
        Ok(Page::new(items, total, page, limit))
    }

    pub async fn delete_question(&self, id: Uuid) -> Result<(), StudyError> {
        if self.storage.questions.delete(id).await? {
            info!(%id, "question deleted");
            Ok(())
        } else {
            Err(StudyError::NotFound("Question not found".into()))
        }
    }

    /// Random quiz matching `filter`, with answers hidden.
    pub async fn generate_quiz(
        &self,
        filter: &QuestionFilter,
        count: Option<usize>,
    ) -> Result<Vec<QuizQuestion>, StudyError> {
        let count = count
            .unwrap_or(self.settings.default_count)
            .clamp(1, self.settings.max_count.max(1));
        let questions = self.storage.questions.sample(filter, count).await?;
        if questions.is_empty() {
            return Err(StudyError::NotFound(
                "No questions found for the given criteria".into(),
            ));
        }
        Ok(questions.iter().map(QuizQuestion::from).collect())
    }

    /// Grade and persist a quiz attempt.
    #[instrument(skip(self, answers), fields(answers = answers.len()))]
    pub async fn submit_quiz(
        &self,
        user_id: Uuid,
        answers: &[SubmittedAnswer],
        time_spent: i64,
    ) -> Result<QuizResult, StudyError> {
        let ids = validate_submission(answers, time_spent)?;
        let questions: HashMap<Uuid, Question> = self
            .storage
            .questions
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();

        let config = ScoringConfig {
            theory_match_threshold: self.settings.theory_match_threshold,
        };
        let mut result = score_validated(&questions, &ids, answers, time_spent, &config)?;

        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            user_id,
            topic: attempt_topic(ids.iter().filter_map(|id| questions.get(id))),
            score: result.score,
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            incorrect_answers: result.incorrect_answers,
            time_spent: result.time_spent,
            completed: true,
            answers: result.results.clone(),
            created_at: Utc::now(),
        };
        self.storage.attempts.insert(&attempt).await?;
        info!(attempt = %attempt.id, score = attempt.score, "quiz submitted");

        result.attempt_id = Some(attempt.id);
        Ok(result)
    }

    pub async fn analytics(&self, user_id: Uuid) -> Result<AnalyticsReport, StudyError> {
        let attempts = self.storage.attempts.all_for_user(user_id).await?;

        let mut ids: Vec<Uuid> = attempts
            .iter()
            .flat_map(|a| a.answers.iter().map(|r| r.question_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let questions: HashMap<Uuid, Question> = self
            .storage
            .questions
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();

        Ok(AnalyticsReport {
            quiz_analytics: compute_quiz_analytics(
                &attempts,
                &questions,
                self.settings.recent_window,
            ),
            question_analytics: compute_question_analytics(&attempts),
        })
    }

    /// A user's attempts, newest first.
    pub async fn history(
        &self,
        user_id: Uuid,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<AttemptSummary>, StudyError> {
        let (page, limit) = paging(page, limit);
        let offset = u64::from(page - 1) * u64::from(limit);
        let total = self.storage.attempts.count_for_user(user_id).await?;
        let items: Vec<AttemptSummary> = self
            .storage
            .attempts
            .list_for_user(user_id, offset, u64::from(limit))
            .await?
            .iter()
            .map(QuizAttempt::summary)
            .collect();
        Ok(Page::new(items, total, page, limit))
    }

    /// A single attempt with its answers. Only the owner or an admin may see it.
    pub async fn attempt(
        &self,
        user_id: Uuid,
        role: Role,
        attempt_id: Uuid,
    ) -> Result<QuizAttempt, StudyError> {
        let attempt = match self.storage.attempts.get(attempt_id).await {
            Ok(a) => a,
            Err(StorageError::NotFound) => {
                return Err(StudyError::NotFound("Quiz attempt not found".into()))
            }
            Err(e) => return Err(e.into()),
        };
        if attempt.user_id != user_id && role != Role::Admin {
            return Err(StudyError::Forbidden(
                "Not authorized to view this attempt".into(),
            ));
        }
        Ok(attempt)
    }

    pub async fn topics(&self) -> Result<Vec<TopicSummary>, StudyError> {
        Ok(self.storage.questions.topic_summaries().await?)
    }

    /// Theory questions with their reference answers, for self-study review.
    pub async fn theory_questions(&self, topic: Option<String>) -> Result<Vec<Question>, StudyError> {
        let filter = QuestionFilter {
            topic,
            kind: Some(QuestionType::Theory),
            difficulty: None,
        };
        let limit = self.storage.questions.count(&filter).await?;
        Ok(self.storage.questions.list(&filter, 0, limit).await?)
    }
}

/// Normalize 1-based paging parameters.
fn paging(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

/// The shared topic of all questions, or "Mixed".
fn attempt_topic<'a>(mut questions: impl Iterator<Item = &'a Question>) -> String {
    let Some(first) = questions.next() else {
        return MIXED_TOPIC.to_string();
    };
    if questions.all(|q| q.topic == first.topic) {
        first.topic.clone()
    } else {
        MIXED_TOPIC.to_string()
    }
}
