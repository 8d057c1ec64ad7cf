mod chat_service;
mod memory;
mod message_service;

pub use chat_service::ChatService;
pub use message_service::{InlineUpload, MessageInput, MessageService};
