use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Database model for users
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub username: Option<String>,
    pub is_confirmed: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Name shown in greetings and passed to the assistant persona
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}
