use sqlx::SqlitePool;
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::users::models::User;

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Service for user account records
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Create an unconfirmed user
    ///
    /// Returns `Conflict` when the email is already registered.
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, is_confirmed)
            VALUES (?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        info!("User created: id={}", user.id);
        Ok(user)
    }

    pub async fn mark_confirmed(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET is_confirmed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("User confirmed: id={}", id);
        Ok(())
    }

    /// Set the username; `Conflict` when another account already uses it
    pub async fn set_username(&self, id: i64, username: &str) -> Result<()> {
        sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(username)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Username already taken".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;
        Ok(())
    }
}
