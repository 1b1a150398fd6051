use std::sync::Arc;
use std::time::Duration;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use tracing::info;

use studypulse_core::store::{AttemptRepository, QuestionRepository, Storage, UserRepository};

mod attempt_repo;
mod mapping;
mod migrate;
mod question_repo;
mod user_repo;

/// Ids bound per `IN (...)` query, well under SQLite's variable limit.
const ID_BATCH: usize = 500;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// setting the connection pragmas fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Wrap this repository in a [`Storage`].
    #[must_use]
    pub fn into_storage(self) -> Storage {
        let questions: Arc<dyn QuestionRepository> = Arc::new(self.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(self.clone());
        let users: Arc<dyn UserRepository> = Arc::new(self);
        Storage {
            questions,
            attempts,
            users,
        }
    }
}

/// Open a `SQLite` database, run migrations and return a [`Storage`].
///
/// # Errors
///
/// Returns `SqliteInitError` if connection or migrations cannot be completed.
pub async fn connect(database_url: &str) -> Result<Storage, SqliteInitError> {
    let repo = SqliteRepository::connect(database_url).await?;
    repo.migrate().await?;
    info!("sqlite storage ready");
    Ok(repo.into_storage())
}
