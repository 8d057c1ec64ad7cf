//! Chat-completion client and the reply/title bridge built on it

mod bridge;
pub mod client;

pub use bridge::AiBridge;
pub use client::{ChatCompletionClient, ChatMessage, OpenRouterClient};
