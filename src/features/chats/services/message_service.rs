use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::memory::ChatMemory;
use crate::core::error::Result;
use crate::features::attachments::{Attachment, AttachmentService};
use crate::features::auth::AuthenticatedUser;
use crate::features::chats::models::{Chat, Sender};
use crate::modules::extraction::{ContentExtractor, ExtractionError};
use crate::shared::constants::{
    DEFAULT_CHAT_NAME, MAX_ATTACHMENT_PROMPT_CHARS, MAX_EXTRACT_CHARS, TITLE_PROMPT_PREFIX_CHARS,
};
use crate::shared::llm::AiBridge;
use crate::shared::text::truncate_chars;

/// A file sent along with a message; read for its text and never stored
#[derive(Debug, Clone)]
pub struct InlineUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// What the user submitted in one turn
#[derive(Debug, Clone, Default)]
pub struct MessageInput {
    pub text: String,
    pub uploads: Vec<InlineUpload>,
    /// Raw ids of previously uploaded attachments
    pub attachment_ids: Vec<Value>,
}

/// Ids the client left blank (`null`, `0`, `""`, `false`) count as absent
fn is_present(id: &Value) -> bool {
    match id {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn attachments_block(snippets: &[String]) -> String {
    format!(
        "\n\n--- Attachments ---\n{}\n--- End attachments ---\n",
        snippets.join("\n\n")
    )
}

/// Turns a user submission into a stored exchange with an assistant reply
pub struct MessageService {
    pool: SqlitePool,
    attachments: Arc<AttachmentService>,
    extractor: Arc<ContentExtractor>,
    bridge: Arc<AiBridge>,
    public_base_url: String,
}

impl MessageService {
    pub fn new(
        pool: SqlitePool,
        attachments: Arc<AttachmentService>,
        extractor: Arc<ContentExtractor>,
        bridge: Arc<AiBridge>,
        public_base_url: String,
    ) -> Self {
        Self {
            pool,
            attachments,
            extractor,
            bridge,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Text of an in-flight upload, or a placeholder when it cannot be read
    async fn upload_text(&self, upload: &InlineUpload) -> String {
        let content_type = upload.content_type.as_deref().unwrap_or_default();
        match self
            .extractor
            .extract_bytes(
                upload.data.clone(),
                &upload.filename,
                content_type,
                MAX_EXTRACT_CHARS,
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("{}", e);
                e.placeholder()
            }
        }
    }

    /// Snippet standing in for a stored attachment inside the prompt
    async fn attachment_snippet(&self, attachment: &Attachment) -> String {
        let path = self.attachments.path_for(attachment);
        match self
            .extractor
            .extract_file(
                &path,
                &attachment.filename,
                attachment.content_type_or_default(),
                MAX_ATTACHMENT_PROMPT_CHARS,
            )
            .await
        {
            Ok(text) => text,
            Err(e @ ExtractionError::Io { .. }) => {
                warn!("Failed to read stored attachment {}: {}", attachment.id, e);
                format!(
                    "[Attachment: {}] Accessible at: {}{}",
                    attachment.filename,
                    self.public_base_url,
                    attachment.url()
                )
            }
            Err(e) => {
                warn!("{}", e);
                e.placeholder()
            }
        }
    }

    /// Attachments among `ids` that belong to `user_id`, in request order
    async fn resolve_attachments(&self, ids: &[Value], user_id: i64) -> Result<Vec<Attachment>> {
        let mut resolved = Vec::new();
        for raw_id in ids {
            match self.attachments.resolve_owned(raw_id, user_id).await? {
                Ok(attachment) => resolved.push(attachment),
                Err(rejection) => debug!("Skipping attachment reference: {}", rejection),
            }
        }
        Ok(resolved)
    }

    /// Handle one user turn in `chat` and return the assistant reply.
    ///
    /// An empty submission returns an empty reply and writes nothing.
    pub async fn send(
        &self,
        user: &AuthenticatedUser,
        chat: &Chat,
        input: MessageInput,
    ) -> Result<String> {
        let attachment_ids: Vec<Value> = input
            .attachment_ids
            .into_iter()
            .filter(is_present)
            .collect();

        let mut prompt = input.text.clone();
        for upload in &input.uploads {
            if upload.filename.is_empty() {
                continue;
            }
            let text = self.upload_text(upload).await;
            prompt.push_str(&format!("\n\n[Uploaded: {}]\n{}", upload.filename, text));
        }
        let mut prompt = prompt.trim().to_string();

        if prompt.is_empty() && attachment_ids.is_empty() {
            return Ok(String::new());
        }

        let attachments = self.resolve_attachments(&attachment_ids, user.id).await?;
        let mut snippets = Vec::with_capacity(attachments.len());
        for attachment in &attachments {
            let snippet = self.attachment_snippet(attachment).await;
            if !snippet.is_empty() {
                snippets.push(snippet);
            }
        }
        if !snippets.is_empty() {
            prompt = format!("{}\n\n{}", prompt, attachments_block(&snippets))
                .trim()
                .to_string();
        }

        let mut memory = ChatMemory::from_column(&chat.memory, chat.id);
        let reply = self
            .bridge
            .generate_reply(&prompt, user.persona_name(), memory.entries())
            .await;

        let title = if chat.name == DEFAULT_CHAT_NAME && !input.text.is_empty() {
            Some(
                self.bridge
                    .generate_title(&truncate_chars(&input.text, TITLE_PROMPT_PREFIX_CHARS))
                    .await,
            )
        } else {
            None
        };

        memory.record_exchange(&prompt, &reply);
        let memory_column = memory.to_column()?;

        let mut tx = self.pool.begin().await?;

        let (user_message_id,): (i64,) = sqlx::query_as(
            "INSERT INTO messages (chat_id, content, sender) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(chat.id)
        .bind(&prompt)
        .bind(Sender::User)
        .fetch_one(&mut *tx)
        .await?;

        for attachment in &attachments {
            sqlx::query(
                "UPDATE attachments SET chat_id = ?, message_id = ? WHERE id = ? AND user_id = ?",
            )
            .bind(chat.id)
            .bind(user_message_id)
            .bind(attachment.id)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT INTO messages (chat_id, content, sender) VALUES (?, ?, ?)")
            .bind(chat.id)
            .bind(&reply)
            .bind(Sender::Assistant)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE chats SET memory = ?, name = COALESCE(?, name) WHERE id = ?")
            .bind(&memory_column)
            .bind(title.as_deref())
            .bind(chat.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            "Exchange stored: chat_id={}, user_message_id={}, attachments={}",
            chat.id,
            user_message_id,
            attachments.len()
        );
        Ok(reply)
    }

    /// Open a new titled chat whose first turn is the upload's text plus `prompt`
    pub async fn start_chat_from_upload(
        &self,
        user: &AuthenticatedUser,
        prompt: &str,
        upload: InlineUpload,
    ) -> Result<Chat> {
        let file_text = self.upload_text(&upload).await;
        let combined = if prompt.is_empty() {
            file_text
        } else {
            format!("{}\n\n{}", prompt.trim(), file_text)
                .trim()
                .to_string()
        };

        let title = self
            .bridge
            .generate_title(&truncate_chars(&combined, TITLE_PROMPT_PREFIX_CHARS))
            .await;
        let reply = self
            .bridge
            .generate_reply(&combined, user.persona_name(), &[])
            .await;

        let mut memory = ChatMemory::default();
        memory.record_exchange(&combined, &reply);
        let memory_column = memory.to_column()?;

        let mut tx = self.pool.begin().await?;

        let chat = sqlx::query_as::<_, Chat>(
            "INSERT INTO chats (user_id, name, memory) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(user.id)
        .bind(&title)
        .bind(&memory_column)
        .fetch_one(&mut *tx)
        .await?;

        for (content, sender) in [(&combined, Sender::User), (&reply, Sender::Assistant)] {
            sqlx::query("INSERT INTO messages (chat_id, content, sender) VALUES (?, ?, ?)")
                .bind(chat.id)
                .bind(content)
                .bind(sender)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            "Chat started from upload: id={}, file={}",
            chat.id, upload.filename
        );
        Ok(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chats::services::ChatService;
    use crate::modules::extraction::ocr::DisabledOcr;
    use crate::modules::storage::LocalStorage;
    use crate::shared::llm::client::Role;
    use crate::shared::llm::ChatMessage;
    use crate::shared::test_helpers::{
        create_confirmed_user, test_llm_config, test_pool, StubCompletionClient,
    };
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        client: Arc<StubCompletionClient>,
        attachments: Arc<AttachmentService>,
        chats: ChatService,
        messages: MessageService,
        pool: SqlitePool,
    }

    async fn fixture(reply: &str) -> Fixture {
        let pool = test_pool().await;
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()));
        let attachments = Arc::new(AttachmentService::new(
            pool.clone(),
            storage,
            vec!["txt".to_string(), "pdf".to_string()],
        ));
        let client = Arc::new(StubCompletionClient::replying(reply));
        let bridge = Arc::new(AiBridge::new(client.clone(), test_llm_config()));
        let extractor = Arc::new(ContentExtractor::new(Box::new(DisabledOcr)));

        Fixture {
            _dir: dir,
            client,
            attachments: attachments.clone(),
            chats: ChatService::new(pool.clone()),
            messages: MessageService::new(
                pool.clone(),
                attachments,
                extractor,
                bridge,
                "http://localhost:5000/".to_string(),
            ),
            pool,
        }
    }

    fn text_input(text: &str) -> MessageInput {
        MessageInput {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_submission_writes_nothing() {
        let fx = fixture("unused").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let chat = fx.chats.create(user.id, DEFAULT_CHAT_NAME).await.unwrap();

        let input = MessageInput {
            text: "   ".to_string(),
            attachment_ids: vec![Value::Null, json!("")],
            ..Default::default()
        };
        let reply = fx.messages.send(&user.into(), &chat, input).await.unwrap();

        assert_eq!(reply, "");
        assert!(fx.chats.messages(chat.id).await.unwrap().is_empty());
        assert!(fx.client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_is_stored_and_chat_titled() {
        let fx = fixture("Hello there").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let chat = fx.chats.create(user.id, DEFAULT_CHAT_NAME).await.unwrap();

        let reply = fx
            .messages
            .send(&user.into(), &chat, text_input("Plan a trip"))
            .await
            .unwrap();
        assert_eq!(reply, "Hello there");

        let messages = fx.chats.messages(chat.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "Plan a trip");
        assert_eq!(messages[1].sender, Sender::Assistant);

        let stored = fx.chats.find_by_id(chat.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Hello there");
        let memory = ChatMemory::from_column(&stored.memory, chat.id);
        assert_eq!(memory.entries()[0], ChatMessage::user("Plan a trip"));
        assert_eq!(memory.entries()[1], ChatMessage::assistant("Hello there"));

        let requests = fx.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].model, test_llm_config().title_model);
    }

    #[tokio::test]
    async fn test_text_attachment_content_reaches_prompt() {
        let fx = fixture("Got it").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let chat = fx.chats.create(user.id, "Notes").await.unwrap();
        let attachment = fx
            .attachments
            .upload(
                user.id,
                None,
                "notes.txt",
                Some("text/plain"),
                b"The launch code is 1234",
            )
            .await
            .unwrap();

        let input = MessageInput {
            text: "Summarise this".to_string(),
            attachment_ids: vec![json!(attachment.id)],
            ..Default::default()
        };
        fx.messages.send(&user.into(), &chat, input).await.unwrap();

        let requests = fx.client.requests();
        assert_eq!(requests.len(), 1, "named chats are not retitled");
        let last = requests[0].messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(
            last.content,
            "Summarise this\n\n\n\n--- Attachments ---\nThe launch code is 1234\n--- End attachments ---"
        );

        let linked = fx
            .attachments
            .find_by_id(attachment.id)
            .await
            .unwrap()
            .unwrap();
        let messages = fx.chats.messages(chat.id).await.unwrap();
        assert_eq!(linked.chat_id, Some(chat.id));
        assert_eq!(linked.message_id, Some(messages[0].id));
    }

    #[tokio::test]
    async fn test_foreign_and_invalid_attachments_are_skipped() {
        let fx = fixture("ok").await;
        let alice = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let bob = create_confirmed_user(&fx.pool, "b@gmail.com", Some("bob")).await;
        let chat = fx.chats.create(alice.id, "Mine").await.unwrap();
        let foreign = fx
            .attachments
            .upload(bob.id, None, "secret.txt", Some("text/plain"), b"bob only")
            .await
            .unwrap();

        let input = MessageInput {
            text: "hi".to_string(),
            attachment_ids: vec![json!(foreign.id), json!("abc"), json!(999)],
            ..Default::default()
        };
        fx.messages.send(&alice.into(), &chat, input).await.unwrap();

        let requests = fx.client.requests();
        let prompt = &requests[0].messages.last().unwrap().content;
        assert_eq!(prompt, "hi");
        let untouched = fx.attachments.find_by_id(foreign.id).await.unwrap().unwrap();
        assert_eq!(untouched.chat_id, None);
        assert_eq!(untouched.message_id, None);
    }

    #[tokio::test]
    async fn test_missing_file_becomes_placeholder() {
        let fx = fixture("ok").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let chat = fx.chats.create(user.id, "Mine").await.unwrap();
        let attachment = fx
            .attachments
            .upload(user.id, None, "gone.txt", Some("text/plain"), b"x")
            .await
            .unwrap();
        tokio::fs::remove_file(fx.attachments.path_for(&attachment))
            .await
            .unwrap();

        let input = MessageInput {
            attachment_ids: vec![json!(attachment.id.to_string())],
            ..Default::default()
        };
        fx.messages.send(&user.into(), &chat, input).await.unwrap();

        let requests = fx.client.requests();
        let prompt = &requests[0].messages.last().unwrap().content;
        assert!(prompt.contains("[Attachment: gone.txt] (file missing)"));
    }

    #[tokio::test]
    async fn test_inline_upload_is_read_not_stored() {
        let fx = fixture("ok").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let chat = fx.chats.create(user.id, "Mine").await.unwrap();

        let input = MessageInput {
            text: "Look".to_string(),
            uploads: vec![InlineUpload {
                filename: "a.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                data: b"inline body".to_vec(),
            }],
            ..Default::default()
        };
        fx.messages.send(&user.into(), &chat, input).await.unwrap();

        let messages = fx.chats.messages(chat.id).await.unwrap();
        assert_eq!(messages[0].content, "Look\n\n[Uploaded: a.txt]\ninline body");
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attachments")
            .fetch_one(&fx.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_memory_window_holds_after_many_turns() {
        let fx = fixture("reply").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;
        let mut chat = fx.chats.create(user.id, "Long").await.unwrap();
        let user: AuthenticatedUser = user.into();

        for i in 0..12 {
            fx.messages
                .send(&user, &chat, text_input(&format!("turn {}", i)))
                .await
                .unwrap();
            chat = fx.chats.find_by_id(chat.id).await.unwrap().unwrap();
        }

        let memory = ChatMemory::from_column(&chat.memory, chat.id);
        assert_eq!(memory.len(), 20);
        assert_eq!(memory.entries()[18], ChatMessage::user("turn 11"));
        assert_eq!(memory.entries()[19], ChatMessage::assistant("reply"));

        // The previous window is sent before the new turn
        let last_request = fx.client.last_request().unwrap();
        assert_eq!(last_request.messages.len(), 1 + 20 + 1);
    }

    #[tokio::test]
    async fn test_start_chat_from_upload() {
        let fx = fixture("Summary").await;
        let user = create_confirmed_user(&fx.pool, "a@gmail.com", Some("alice")).await;

        let chat = fx
            .messages
            .start_chat_from_upload(
                &user.into(),
                " What is this? ",
                InlineUpload {
                    filename: "doc.txt".to_string(),
                    content_type: None,
                    data: b"quarterly numbers".to_vec(),
                },
            )
            .await
            .unwrap();

        assert_eq!(chat.name, "Summary");
        let messages = fx.chats.messages(chat.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "What is this?\n\nquarterly numbers");
        assert_eq!(messages[1].content, "Summary");
        assert_eq!(ChatMemory::from_column(&chat.memory, chat.id).len(), 2);
    }
}
