//! Chat threads, their messages and the assistant exchange.
//!
//! | method | path                      | handler        |
//! |--------|---------------------------|----------------|
//! | GET    | `/chat?chat_id=`          | `chat_view`    |
//! | POST   | `/new_chat`               | `new_chat`     |
//! | POST   | `/delete_chat/{chat_id}`  | `delete_chat`  |
//! | POST   | `/rename_chat/{chat_id}`  | `rename_chat`  |
//! | POST   | `/send_message/{chat_id}` | `send_message` |
//! | POST   | `/upload_chat`            | `upload_chat`  |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::{routes, ChatState};
pub use services::{ChatService, MessageService};
