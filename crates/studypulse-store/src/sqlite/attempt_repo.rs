use std::collections::HashMap;

use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use studypulse_core::model::{AnswerRecord, QuizAttempt};
use studypulse_core::store::{AttemptRepository, StorageError};

use super::{
    mapping::{conn, map_answer_row, map_attempt_row, ser, to_i64, write_err},
    SqliteRepository, ID_BATCH,
};

const ATTEMPT_COLUMNS: &str = "id, user_id, topic, score, total_questions, correct_answers, \
    incorrect_answers, time_spent, completed, created_at";

impl SqliteRepository {
    /// Attach stored answers to freshly mapped attempts.
    async fn with_answers(&self, mut attempts: Vec<QuizAttempt>) -> Result<Vec<QuizAttempt>, StorageError> {
        if attempts.is_empty() {
            return Ok(attempts);
        }

        let mut by_attempt: HashMap<Uuid, Vec<AnswerRecord>> = HashMap::new();
        for batch in attempts.chunks(ID_BATCH) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT attempt_id, position, question_id, user_answer, is_correct, correct_answer \
                 FROM attempt_answers WHERE attempt_id IN (",
            );
            let mut separated = qb.separated(", ");
            for a in batch {
                separated.push_bind(a.id.to_string());
            }
            separated.push_unseparated(") ORDER BY attempt_id, position");

            let rows = qb.build().fetch_all(&self.pool).await.map_err(conn)?;
            for row in &rows {
                let (attempt_id, record) = map_answer_row(row)?;
                by_attempt.entry(attempt_id).or_default().push(record);
            }
        }

        for attempt in &mut attempts {
            attempt.answers = by_attempt.remove(&attempt.id).unwrap_or_default();
        }
        Ok(attempts)
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn insert(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let attempt_id = attempt.id.to_string();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    id, user_id, topic, score, total_questions, correct_answers,
                    incorrect_answers, time_spent, completed, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(&attempt_id)
        .bind(attempt.user_id.to_string())
        .bind(&attempt.topic)
        .bind(attempt.score)
        .bind(i64::from(attempt.total_questions))
        .bind(i64::from(attempt.correct_answers))
        .bind(i64::from(attempt.incorrect_answers))
        .bind(to_i64("time_spent", attempt.time_spent)?)
        .bind(attempt.completed)
        .bind(attempt.created_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        for (position, answer) in attempt.answers.iter().enumerate() {
            sqlx::query(
                r"
                    INSERT INTO attempt_answers (
                        attempt_id, position, question_id, user_answer, is_correct, correct_answer
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(&attempt_id)
            .bind(to_i64("position", position)?)
            .bind(answer.question_id.to_string())
            .bind(&answer.user_answer)
            .bind(answer.is_correct)
            .bind(&answer.correct_answer)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<QuizAttempt, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let attempt = map_attempt_row(&row)?;
        let mut loaded = self.with_answers(vec![attempt]).await?;
        loaded.pop().ok_or(StorageError::NotFound)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE user_id = ?1 \
             ORDER BY created_at DESC, id LIMIT ?2 OFFSET ?3"
        ))
        .bind(user_id.to_string())
        .bind(to_i64("limit", limit)?)
        .bind(to_i64("offset", offset)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let attempts = rows
            .iter()
            .map(map_attempt_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_answers(attempts).await
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM quiz_attempts WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }

    async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE user_id = ?1 \
             ORDER BY created_at DESC, id"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let attempts = rows
            .iter()
            .map(map_attempt_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_answers(attempts).await
    }
}
