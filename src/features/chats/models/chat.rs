use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Database model for chats
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Chat {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: NaiveDateTime,
    /// JSON array of recent conversational turns
    #[serde(skip)]
    pub memory: String,
}
