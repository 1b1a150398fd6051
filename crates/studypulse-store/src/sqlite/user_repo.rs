use uuid::Uuid;

use studypulse_core::model::User;
use studypulse_core::store::{StorageError, UserRepository};

use super::{
    mapping::{conn, map_user_row, write_err},
    SqliteRepository,
};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO users (id, email, name, password_hash, role, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        // email is declared COLLATE NOCASE
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, role, created_at FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn get(&self, id: Uuid) -> Result<User, StorageError> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, role, created_at FROM users WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;
        map_user_row(&row)
    }
}
