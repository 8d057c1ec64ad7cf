//! Outgoing mail
//!
//! SMTP delivery via lettre, or a logging fallback when no server is configured.

pub mod mailer;

pub use mailer::{mailer_from_config, Mailer, OutgoingEmail};
