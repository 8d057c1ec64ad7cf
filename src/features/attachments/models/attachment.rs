use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Database model for attachments
#[derive(Debug, Clone, FromRow)]
pub struct Attachment {
    pub id: i64,
    /// Sanitised original filename
    pub filename: String,
    /// Randomised name on disk
    pub stored_name: String,
    pub content_type: Option<String>,
    pub upload_time: NaiveDateTime,
    pub user_id: i64,
    pub chat_id: Option<i64>,
    pub message_id: Option<i64>,
}

impl Attachment {
    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }

    pub fn url(&self) -> String {
        format!("/files/{}", self.id)
    }
}
