use serde_json::Value;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::attachments::models::Attachment;
use crate::modules::storage::{sanitize_filename, LocalStorage};

/// Why a client-supplied attachment reference was not used
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentRejection {
    #[error("attachment id {0} is not a valid id")]
    InvalidId(String),

    #[error("attachment {0} does not exist")]
    NotFound(i64),

    #[error("attachment {0} belongs to another user")]
    NotOwned(i64),
}

/// Parse a client-supplied id. Accepts positive integers or numeric strings.
fn parse_attachment_id(raw: &Value) -> std::result::Result<i64, AttachmentRejection> {
    let id = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(AttachmentRejection::InvalidId(raw.to_string())),
    }
}

/// Service for attachment records and their stored files
pub struct AttachmentService {
    pool: SqlitePool,
    storage: Arc<LocalStorage>,
    allowed_extensions: Vec<String>,
}

impl AttachmentService {
    pub fn new(
        pool: SqlitePool,
        storage: Arc<LocalStorage>,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            pool,
            storage,
            allowed_extensions,
        }
    }

    fn is_extension_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|ext| self.allowed_extensions.contains(&ext))
    }

    /// Store an upload on disk and record it for `user_id`
    pub async fn upload(
        &self,
        user_id: i64,
        chat_id: Option<i64>,
        original_filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<Attachment> {
        let filename = sanitize_filename(original_filename);
        if !self.is_extension_allowed(&filename) {
            return Err(AppError::BadRequest(format!(
                "File type not allowed. Allowed extensions: {}",
                self.allowed_extensions.join(", ")
            )));
        }

        let stored_name = self.storage.generate_key(&filename);
        self.storage.upload(&stored_name, data).await?;

        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (filename, stored_name, content_type, user_id, chat_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&filename)
        .bind(&stored_name)
        .bind(content_type)
        .bind(user_id)
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Attachment saved: id={}, stored_name={}, size={}",
            attachment.id,
            attachment.stored_name,
            data.len()
        );
        Ok(attachment)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Attachment>> {
        let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attachment)
    }

    /// Fetch an attachment for its owner; `Forbidden` for anyone else
    pub async fn get_owned(&self, id: i64, user_id: i64) -> Result<Attachment> {
        let attachment = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if attachment.user_id != user_id {
            return Err(AppError::Forbidden("Forbidden".to_string()));
        }
        Ok(attachment)
    }

    /// Resolve a client-supplied reference to an attachment owned by `user_id`.
    ///
    /// The outer result carries database failures; the inner one says why a
    /// reference was rejected.
    pub async fn resolve_owned(
        &self,
        raw_id: &Value,
        user_id: i64,
    ) -> Result<std::result::Result<Attachment, AttachmentRejection>> {
        let id = match parse_attachment_id(raw_id) {
            Ok(id) => id,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let resolved = match self.find_by_id(id).await? {
            None => Err(AttachmentRejection::NotFound(id)),
            Some(att) if att.user_id != user_id => Err(AttachmentRejection::NotOwned(id)),
            Some(att) => Ok(att),
        };
        Ok(resolved)
    }

    /// Location of the attachment's bytes on disk
    pub fn path_for(&self, attachment: &Attachment) -> PathBuf {
        self.storage.path_for(&attachment.stored_name)
    }

    pub async fn read(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        debug!("Reading attachment {} from disk", attachment.id);
        self.storage.download(&attachment.stored_name).await
    }
}
