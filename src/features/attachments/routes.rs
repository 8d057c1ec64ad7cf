use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::attachments::handlers::{serve_file, upload_file};
use crate::features::attachments::services::AttachmentService;
use crate::features::chats::ChatService;

/// State for attachment handlers
#[derive(Clone)]
pub struct AttachmentState {
    pub attachments: Arc<AttachmentService>,
    pub chats: Arc<ChatService>,
}

/// Create routes for the attachments feature
pub fn routes(state: AttachmentState) -> Router {
    Router::new()
        .route("/upload_file/{chat_id}", post(upload_file))
        .route("/files/{file_id}", get(serve_file))
        .with_state(state)
}
