//! Features layer - one module per user-facing area, each with its own
//! routes, handlers, services and models.

pub mod attachments;
pub mod auth;
pub mod chats;
pub mod users;
