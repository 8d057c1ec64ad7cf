use serde::Serialize;

use crate::features::attachments::models::Attachment;

#[derive(Debug, Serialize)]
pub struct AttachmentFileDto {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub content_type: Option<String>,
}

impl From<&Attachment> for AttachmentFileDto {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id,
            filename: attachment.filename.clone(),
            url: attachment.url(),
            content_type: attachment.content_type.clone(),
        }
    }
}

/// Response body of `POST /upload_file/{chat_id}`
#[derive(Debug, Serialize)]
pub struct UploadFileResponseDto {
    pub success: bool,
    pub file: AttachmentFileDto,
}
