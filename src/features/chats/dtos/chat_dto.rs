use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string of the chat view
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    /// Kept as text so that a malformed id falls back to the newest chat
    pub chat_id: Option<String>,
}

/// A reference to an uploaded attachment; the id is validated later
#[derive(Debug, Deserialize)]
pub struct AttachmentRefDto {
    #[serde(default)]
    pub id: Value,
}

/// JSON body of `POST /send_message/{chat_id}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendMessageDto {
    pub message: Option<String>,
    pub attachments: Option<Vec<AttachmentRefDto>>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponseDto {
    pub reply: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenameChatDto {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenameChatForm {
    pub new_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenameChatResponseDto {
    pub success: bool,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteChatResponseDto {
    pub redirect: String,
}
