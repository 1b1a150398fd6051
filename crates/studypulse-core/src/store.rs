//! Repository contracts and an in-memory backend.
//!
//! The SQLite backend lives in `studypulse-store`; both are exposed to the
//! rest of the system through [`Storage`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Question, QuestionFilter, QuestionType, QuizAttempt, TopicSummary, User};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist a batch of new questions atomically.
    async fn insert_many(&self, questions: &[Question]) -> Result<(), StorageError>;

    /// Fetch one question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get(&self, id: Uuid) -> Result<Question, StorageError>;

    /// Fetch the questions that exist among `ids`, in no particular order.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Question>, StorageError>;

    /// Matching questions, newest first.
    async fn list(
        &self,
        filter: &QuestionFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Question>, StorageError>;

    async fn count(&self, filter: &QuestionFilter) -> Result<u64, StorageError>;

    /// Up to `count` distinct matching questions chosen uniformly at random.
    async fn sample(&self, filter: &QuestionFilter, count: usize)
        -> Result<Vec<Question>, StorageError>;

    /// Returns `false` when no question had this id.
    async fn delete(&self, id: Uuid) -> Result<bool, StorageError>;

    /// Question counts per topic, sorted by topic name.
    async fn topic_summaries(&self) -> Result<Vec<TopicSummary>, StorageError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn insert(&self, attempt: &QuizAttempt) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get(&self, id: Uuid) -> Result<QuizAttempt, StorageError>;

    /// A user's attempts, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<QuizAttempt>, StorageError>;

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, StorageError>;

    /// Every attempt of a user, newest first.
    async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, StorageError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn insert(&self, user: &User) -> Result<(), StorageError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn get(&self, id: Uuid) -> Result<User, StorageError>;
}

/// In-memory repository implementation for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    questions: Arc<Mutex<HashMap<Uuid, Question>>>,
    attempts: Arc<Mutex<HashMap<Uuid, QuizAttempt>>>,
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn page<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn insert_many(&self, questions: &[Question]) -> Result<(), StorageError> {
        let mut guard = lock(&self.questions)?;
        if questions.iter().any(|q| guard.contains_key(&q.id)) {
            return Err(StorageError::Conflict);
        }
        guard.extend(questions.iter().map(|q| (q.id, q.clone())));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Question, StorageError> {
        let guard = lock(&self.questions)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn list(
        &self,
        filter: &QuestionFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        let mut matching: Vec<Question> =
            guard.values().filter(|q| filter.matches(q)).cloned().collect();
        newest_first(&mut matching, |q| q.created_at);
        Ok(page(matching, offset, limit))
    }

    async fn count(&self, filter: &QuestionFilter) -> Result<u64, StorageError> {
        let guard = lock(&self.questions)?;
        Ok(guard.values().filter(|q| filter.matches(q)).count() as u64)
    }

    async fn sample(
        &self,
        filter: &QuestionFilter,
        count: usize,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        let matching: Vec<&Question> = guard.values().filter(|q| filter.matches(q)).collect();
        let mut rng = rand::thread_rng();
        Ok(matching
            .choose_multiple(&mut rng, count)
            .map(|q| (*q).clone())
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut guard = lock(&self.questions)?;
        Ok(guard.remove(&id).is_some())
    }

    async fn topic_summaries(&self) -> Result<Vec<TopicSummary>, StorageError> {
        let guard = lock(&self.questions)?;
        let mut topics: BTreeMap<&str, TopicSummary> = BTreeMap::new();
        for q in guard.values() {
            let entry = topics.entry(q.topic.as_str()).or_insert_with(|| TopicSummary {
                name: q.topic.clone(),
                question_count: 0,
                mcq_count: 0,
                theory_count: 0,
            });
            entry.question_count += 1;
            match q.kind {
                QuestionType::Mcq => entry.mcq_count += 1,
                QuestionType::Theory => entry.theory_count += 1,
            }
        }
        Ok(topics.into_values().collect())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryStore {
    async fn insert(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = lock(&self.attempts)?;
        if guard.contains_key(&attempt.id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<QuizAttempt, StorageError> {
        let guard = lock(&self.attempts)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let all = self.all_for_user(user_id).await?;
        Ok(page(all, offset, limit))
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let guard = lock(&self.attempts)?;
        Ok(guard.values().filter(|a| a.user_id == user_id).count() as u64)
    }

    async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = lock(&self.attempts)?;
        let mut mine: Vec<QuizAttempt> = guard
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut mine, |a| a.created_at);
        Ok(mine)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = lock(&self.users)?;
        let taken = guard
            .values()
            .any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(StorageError::Conflict);
        }
        guard.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let guard = lock(&self.users)?;
        Ok(guard
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<User, StorageError> {
        let guard = lock(&self.users)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            questions: Arc::new(store.clone()),
            attempts: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }
}
