use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use studypulse_core::model::{AnswerRecord, Question, QuizAttempt, User};
use studypulse_core::store::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Like [`conn`], but unique-constraint violations become `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

pub(crate) fn to_i64<T: TryInto<i64>>(field: &'static str, v: T) -> Result<i64, StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn get_u32(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    let v: i64 = row.try_get(field).map_err(ser)?;
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_uuid(row: &SqliteRow, field: &'static str) -> Result<Uuid, StorageError> {
    let s: String = row.try_get(field).map_err(ser)?;
    Uuid::parse_str(&s).map_err(ser)
}

fn get_opt_uuid(row: &SqliteRow, field: &'static str) -> Result<Option<Uuid>, StorageError> {
    row.try_get::<Option<String>, _>(field)
        .map_err(ser)?
        .map(|s| Uuid::parse_str(&s).map_err(ser))
        .transpose()
}

fn get_parsed<T>(row: &SqliteRow, field: &'static str) -> Result<T, StorageError>
where
    T: std::str::FromStr<Err = String>,
{
    let s: String = row.try_get(field).map_err(ser)?;
    s.parse().map_err(StorageError::Serialization)
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let options_json: String = row.try_get("options").map_err(ser)?;
    Ok(Question {
        id: get_uuid(row, "id")?,
        kind: get_parsed(row, "kind")?,
        question: row.try_get("question").map_err(ser)?,
        options: serde_json::from_str(&options_json).map_err(ser)?,
        answer: row.try_get("answer").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        topic: row.try_get("topic").map_err(ser)?,
        difficulty: get_parsed(row, "difficulty")?,
        source: row.try_get("source").map_err(ser)?,
        created_by: get_opt_uuid(row, "created_by")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(ser)?,
    })
}

/// Map an attempt row; answers are attached by the caller.
pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let time_spent: i64 = row.try_get("time_spent").map_err(ser)?;
    Ok(QuizAttempt {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        topic: row.try_get("topic").map_err(ser)?,
        score: row.try_get("score").map_err(ser)?,
        total_questions: get_u32(row, "total_questions")?,
        correct_answers: get_u32(row, "correct_answers")?,
        incorrect_answers: get_u32(row, "incorrect_answers")?,
        time_spent: u64::try_from(time_spent)
            .map_err(|_| StorageError::Serialization(format!("invalid time_spent: {time_spent}")))?,
        completed: row.try_get("completed").map_err(ser)?,
        answers: Vec::new(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    })
}

/// Map an `attempt_answers` row to its attempt id and record.
pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<(Uuid, AnswerRecord), StorageError> {
    Ok((
        get_uuid(row, "attempt_id")?,
        AnswerRecord {
            question_id: get_uuid(row, "question_id")?,
            user_answer: row.try_get("user_answer").map_err(ser)?,
            is_correct: row.try_get("is_correct").map_err(ser)?,
            correct_answer: row.try_get("correct_answer").map_err(ser)?,
        },
    ))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    Ok(User {
        id: get_uuid(row, "id")?,
        email: row.try_get("email").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        password_hash: row.try_get("password_hash").map_err(ser)?,
        role: get_parsed(row, "role")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    })
}
