use async_trait::async_trait;

use super::PgStore;
use crate::error::AppError;
use crate::models::user::UserRow;
use crate::models::{Role, User};
use crate::store::UserStore;

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, username, password_hash, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (username, password_hash, role)
             VALUES ($1, $2, $3)
             RETURNING id, username, password_hash, role",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("Username '{}' is already taken", username)),
            other => other,
        })?;
        User::try_from(row)
    }
}
