pub mod attachment_handler;

pub use attachment_handler::{serve_file, upload_file};
