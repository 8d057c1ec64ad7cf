//! Uploaded files owned by a user, optionally tied to a chat and message.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/upload_file/{chat_id}` | Store an upload (`chat_id` 0 = no chat) |
//! | GET | `/files/{file_id}` | Serve a file to its owner |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use models::Attachment;
pub use routes::{routes, AttachmentState};
pub use services::AttachmentService;
