use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::chats::handlers;
use crate::features::chats::services::{ChatService, MessageService};

/// State for chat handlers
#[derive(Clone)]
pub struct ChatState {
    pub chats: Arc<ChatService>,
    pub messages: Arc<MessageService>,
}

/// Create routes for the chats feature
pub fn routes(state: ChatState) -> Router {
    Router::new()
        .route("/chat", get(handlers::chat_view))
        .route("/new_chat", post(handlers::new_chat))
        .route("/delete_chat/{chat_id}", post(handlers::delete_chat))
        .route("/rename_chat/{chat_id}", post(handlers::rename_chat))
        .route("/send_message/{chat_id}", post(handlers::send_message))
        .route("/upload_chat", post(handlers::upload_chat))
        .with_state(state)
}
