//! Storage module for file management
//!
//! Provides the local-disk store for uploaded attachments.

mod local_storage;

pub use local_storage::{sanitize_filename, LocalStorage};
