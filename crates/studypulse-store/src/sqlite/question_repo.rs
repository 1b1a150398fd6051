use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use studypulse_core::model::{Question, QuestionFilter, TopicSummary};
use studypulse_core::store::{QuestionRepository, StorageError};

use super::{
    mapping::{conn, map_question_row, options_to_json, ser, to_i64, write_err},
    SqliteRepository, ID_BATCH,
};

const QUESTION_COLUMNS: &str = "id, kind, question, options, answer, explanation, topic, \
    difficulty, source, created_by, created_at, updated_at";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &QuestionFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(topic) = &filter.topic {
        qb.push(" AND topic = ").push_bind(topic.clone());
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(difficulty) = filter.difficulty {
        qb.push(" AND difficulty = ").push_bind(difficulty.as_str());
    }
}

fn count_u64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid count: {v}")))
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_many(&self, questions: &[Question]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for q in questions {
            sqlx::query(
                r"
                    INSERT INTO questions (
                        id, kind, question, options, answer, explanation, topic,
                        difficulty, source, created_by, created_at, updated_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ",
            )
            .bind(q.id.to_string())
            .bind(q.kind.as_str())
            .bind(&q.question)
            .bind(options_to_json(&q.options)?)
            .bind(&q.answer)
            .bind(q.explanation.as_deref())
            .bind(&q.topic)
            .bind(q.difficulty.as_str())
            .bind(q.source.as_deref())
            .bind(q.created_by.map(|u| u.to_string()))
            .bind(q.created_at)
            .bind(q.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Question, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;
        map_question_row(&row)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut questions = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH) {
            let mut qb = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ("
            ));
            let mut separated = qb.separated(", ");
            for id in batch {
                separated.push_bind(id.to_string());
            }
            separated.push_unseparated(")");

            let rows = qb.build().fetch_all(&self.pool).await.map_err(conn)?;
            for row in &rows {
                questions.push(map_question_row(row)?);
            }
        }
        Ok(questions)
    }

    async fn list(
        &self,
        filter: &QuestionFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Question>, StorageError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {QUESTION_COLUMNS} FROM questions"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(to_i64("limit", limit)?)
            .push(" OFFSET ")
            .push_bind(to_i64("offset", offset)?);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_question_row).collect()
    }

    async fn count(&self, filter: &QuestionFilter) -> Result<u64, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM questions");
        push_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await.map_err(conn)?;
        count_u64(row.try_get("n").map_err(ser)?)
    }

    async fn sample(
        &self,
        filter: &QuestionFilter,
        count: usize,
    ) -> Result<Vec<Question>, StorageError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {QUESTION_COLUMNS} FROM questions"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY RANDOM() LIMIT ")
            .push_bind(to_i64("count", count)?);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_question_row).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn topic_summaries(&self) -> Result<Vec<TopicSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    topic,
                    COUNT(*) AS question_count,
                    SUM(CASE WHEN kind = 'mcq' THEN 1 ELSE 0 END) AS mcq_count,
                    SUM(CASE WHEN kind = 'theory' THEN 1 ELSE 0 END) AS theory_count
                FROM questions
                GROUP BY topic
                ORDER BY topic
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(TopicSummary {
                    name: row.try_get("topic").map_err(ser)?,
                    question_count: count_u64(row.try_get("question_count").map_err(ser)?)?,
                    mcq_count: count_u64(row.try_get("mcq_count").map_err(ser)?)?,
                    theory_count: count_u64(row.try_get("theory_count").map_err(ser)?)?,
                })
            })
            .collect()
    }
}
