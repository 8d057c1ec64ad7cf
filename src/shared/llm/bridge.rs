use std::sync::Arc;
use tracing::{error, warn};

use super::client::{ChatCompletionClient, ChatMessage, CompletionRequest};
use crate::core::config::LlmConfig;
use crate::shared::constants::{
    AI_ERROR_MESSAGE, AI_NO_RESPONSE_MESSAGE, MAX_AI_RESPONSE_CHARS, UNTITLED_CHAT_NAME,
};
use crate::shared::templates::{render_assistant_system_prompt, render_chat_title_prompt};
use crate::shared::text::truncate_chars;

/// Turns prompts and chat memory into assistant replies and chat titles.
///
/// Provider failures never escape: they become fixed fallback strings.
pub struct AiBridge {
    client: Arc<dyn ChatCompletionClient>,
    config: LlmConfig,
}

impl AiBridge {
    pub fn new(client: Arc<dyn ChatCompletionClient>, config: LlmConfig) -> Self {
        Self { client, config }
    }

    /// Generate a short assistant reply.
    ///
    /// `memory` is the conversation before this turn; `prompt` is appended as
    /// the final user message.
    pub async fn generate_reply(
        &self,
        prompt: &str,
        username: &str,
        memory: &[ChatMessage],
    ) -> String {
        let system_prompt = match render_assistant_system_prompt(username, MAX_AI_RESPONSE_CHARS) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to render assistant system prompt: {}", e);
                return AI_ERROR_MESSAGE.to_string();
            }
        };

        let mut messages = Vec::with_capacity(memory.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend_from_slice(memory);
        messages.push(ChatMessage::user(prompt));

        let request = CompletionRequest {
            model: self.config.chat_model.clone(),
            messages,
            max_tokens: Some((MAX_AI_RESPONSE_CHARS / 4) as u32),
            timeout: self.config.reply_timeout,
        };

        match self.client.complete(request).await {
            Ok(response) => match response.first_content() {
                Some(content) => truncate_chars(content, MAX_AI_RESPONSE_CHARS),
                None => {
                    warn!("Completion response contained no choices");
                    AI_NO_RESPONSE_MESSAGE.to_string()
                }
            },
            Err(e) => {
                error!("AI error: {}", e);
                AI_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Generate a chat title of a few words
    pub async fn generate_title(&self, prompt: &str) -> String {
        let instruction = match render_chat_title_prompt() {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to render chat title prompt: {}", e);
                return UNTITLED_CHAT_NAME.to_string();
            }
        };

        let request = CompletionRequest {
            model: self.config.title_model.clone(),
            messages: vec![ChatMessage::system(instruction), ChatMessage::user(prompt)],
            max_tokens: None,
            timeout: self.config.title_timeout,
        };

        match self.client.complete(request).await {
            Ok(response) => match response.first_content().map(str::trim) {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => UNTITLED_CHAT_NAME.to_string(),
            },
            Err(e) => {
                warn!("Chat title generation failed: {}", e);
                UNTITLED_CHAT_NAME.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::llm::client::Role;
    use crate::shared::test_helpers::{test_llm_config, StubCompletionClient};

    fn bridge(client: Arc<StubCompletionClient>) -> AiBridge {
        AiBridge::new(client, test_llm_config())
    }

    #[tokio::test]
    async fn test_reply_request_shape() {
        let client = Arc::new(StubCompletionClient::replying("Hi!"));
        let memory = vec![ChatMessage::user("earlier"), ChatMessage::assistant("sure")];

        let reply = bridge(client.clone())
            .generate_reply("what now?", "neo", &memory)
            .await;

        assert_eq!(reply, "Hi!");
        let request = client.last_request().unwrap();
        assert_eq!(request.model, "meta-llama/llama-3-8b-instruct");
        assert_eq!(request.max_tokens, Some(125));
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("assistant for neo"));
        assert_eq!(&request.messages[1..3], &memory[..]);
        assert_eq!(request.messages[3], ChatMessage::user("what now?"));
        assert_eq!(
            request.messages.iter().filter(|m| m.content == "what now?").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_reply_truncated_to_limit() {
        let long = "ä".repeat(MAX_AI_RESPONSE_CHARS + 50);
        let client = Arc::new(StubCompletionClient::replying(&long));
        let reply = bridge(client).generate_reply("hi", "neo", &[]).await;
        assert_eq!(reply.chars().count(), MAX_AI_RESPONSE_CHARS);
    }

    #[tokio::test]
    async fn test_reply_fallbacks() {
        let empty = Arc::new(StubCompletionClient::without_choices());
        assert_eq!(
            bridge(empty).generate_reply("hi", "neo", &[]).await,
            AI_NO_RESPONSE_MESSAGE
        );

        let failing = Arc::new(StubCompletionClient::failing());
        assert_eq!(
            bridge(failing).generate_reply("hi", "neo", &[]).await,
            AI_ERROR_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_title_is_trimmed_and_falls_back() {
        let client = Arc::new(StubCompletionClient::replying("  Trip Planning \n"));
        assert_eq!(bridge(client.clone()).generate_title("plan a trip").await, "Trip Planning");
        let request = client.last_request().unwrap();
        assert_eq!(request.model, "meta-llama/llama-4-maverick");
        assert_eq!(
            request.messages[0].content,
            "Generate a short title (max 3 words) for this chat. Give only title."
        );

        let failing = Arc::new(StubCompletionClient::failing());
        assert_eq!(bridge(failing).generate_title("x").await, UNTITLED_CHAT_NAME);
    }
}
