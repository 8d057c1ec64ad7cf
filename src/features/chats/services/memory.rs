//! Bounded rolling conversation history stored in `chats.memory`

use tracing::warn;

use crate::core::error::{AppError, Result};
use crate::shared::constants::MEMORY_WINDOW;
use crate::shared::llm::ChatMessage;

/// The most recent turns of a chat, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMemory {
    entries: Vec<ChatMessage>,
}

impl ChatMemory {
    /// Parse the stored column. Unreadable memory is treated as empty.
    pub fn from_column(raw: &str, chat_id: i64) -> Self {
        match serde_json::from_str::<Vec<ChatMessage>>(raw) {
            Ok(entries) => Self { entries },
            Err(e) => {
                warn!("Discarding unreadable memory of chat {}: {}", chat_id, e);
                Self::default()
            }
        }
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append one user/assistant exchange and drop the oldest turns beyond the window
    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.entries.push(ChatMessage::user(user));
        self.entries.push(ChatMessage::assistant(assistant));

        if self.entries.len() > MEMORY_WINDOW {
            let excess = self.entries.len() - MEMORY_WINDOW;
            self.entries.drain(..excess);
        }
    }

    pub fn to_column(&self) -> Result<String> {
        serde_json::to_string(&self.entries)
            .map_err(|e| AppError::Internal(format!("Failed to serialize chat memory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::llm::client::Role;

    #[test]
    fn test_window_is_bounded_and_keeps_latest_pair() {
        let mut memory = ChatMemory::default();
        for i in 0..15 {
            memory.record_exchange(&format!("q{}", i), &format!("a{}", i));
            assert!(memory.len() <= MEMORY_WINDOW);
        }

        assert_eq!(memory.len(), MEMORY_WINDOW);
        let entries = memory.entries();
        assert_eq!(entries[MEMORY_WINDOW - 2], ChatMessage::user("q14"));
        assert_eq!(entries[MEMORY_WINDOW - 1], ChatMessage::assistant("a14"));
        assert_eq!(entries[0], ChatMessage::user("q5"));
    }

    #[test]
    fn test_column_round_trip_uses_lowercase_roles() {
        let mut memory = ChatMemory::default();
        memory.record_exchange("hi", "hello");
        let column = memory.to_column().unwrap();
        assert_eq!(
            column,
            r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#
        );

        let parsed = ChatMemory::from_column(&column, 1);
        assert_eq!(parsed.entries()[1].role, Role::Assistant);
    }

    #[test]
    fn test_unreadable_column_is_empty() {
        assert_eq!(ChatMemory::from_column("not json", 1).len(), 0);
        assert_eq!(ChatMemory::from_column("", 1).len(), 0);
    }
}
