use sqlx::SqlitePool;
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::chats::models::{Chat, Message};
use crate::shared::constants::DEFAULT_CHAT_NAME;
use crate::shared::text::truncate_chars;

/// Longest chat name kept on rename
const MAX_CHAT_NAME_CHARS: usize = 100;

/// Service for chat threads and their message history
pub struct ChatService {
    pool: SqlitePool,
}

impl ChatService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The user's chats, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Chat>> {
        let chats = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chats)
    }

    pub async fn create(&self, user_id: i64, name: &str) -> Result<Chat> {
        let chat = sqlx::query_as::<_, Chat>(
            "INSERT INTO chats (user_id, name, memory) VALUES (?, ?, '[]') RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        info!("Chat created: id={}, user_id={}", chat.id, user_id);
        Ok(chat)
    }

    /// The user's chats, creating a first one when there are none
    pub async fn list_or_create(&self, user_id: i64) -> Result<Vec<Chat>> {
        let chats = self.list_for_user(user_id).await?;
        if !chats.is_empty() {
            return Ok(chats);
        }
        Ok(vec![self.create(user_id, DEFAULT_CHAT_NAME).await?])
    }

    pub async fn find_by_id(&self, chat_id: i64) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    /// Fetch a chat for its owner; `Forbidden` for anyone else
    pub async fn get_owned(&self, chat_id: i64, user_id: i64) -> Result<Chat> {
        let chat = self
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))?;

        if chat.user_id != user_id {
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }
        Ok(chat)
    }

    /// Rename a chat. Blank names leave it unchanged.
    pub async fn rename(&self, chat: Chat, new_name: &str) -> Result<Chat> {
        let new_name = truncate_chars(new_name.trim(), MAX_CHAT_NAME_CHARS);
        if new_name.is_empty() {
            return Ok(chat);
        }

        sqlx::query("UPDATE chats SET name = ? WHERE id = ?")
            .bind(&new_name)
            .bind(chat.id)
            .execute(&self.pool)
            .await?;
        Ok(Chat {
            name: new_name,
            ..chat
        })
    }

    /// Delete a chat with its messages and attachment records
    pub async fn delete(&self, chat_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        info!("Chat deleted: id={}", chat_id);
        Ok(())
    }

    /// Messages of a chat in the order they were written
    pub async fn messages(&self, chat_id: i64) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE chat_id = ? ORDER BY timestamp, id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_confirmed_user, test_pool};

    #[tokio::test]
    async fn test_first_chat_created_on_demand() {
        let pool = test_pool().await;
        let user = create_confirmed_user(&pool, "a@gmail.com", Some("alice")).await;
        let service = ChatService::new(pool);

        let chats = service.list_or_create(user.id).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].name, DEFAULT_CHAT_NAME);
        assert_eq!(chats[0].memory, "[]");

        let again = service.list_or_create(user.id).await.unwrap();
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn test_get_owned_and_rename() {
        let pool = test_pool().await;
        let alice = create_confirmed_user(&pool, "a@gmail.com", Some("alice")).await;
        let bob = create_confirmed_user(&pool, "b@gmail.com", Some("bob")).await;
        let service = ChatService::new(pool);

        let chat = service.create(alice.id, DEFAULT_CHAT_NAME).await.unwrap();
        assert!(matches!(
            service.get_owned(chat.id, bob.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.get_owned(424242, alice.id).await,
            Err(AppError::NotFound(_))
        ));

        let chat = service.rename(chat, "  Trip plans ").await.unwrap();
        assert_eq!(chat.name, "Trip plans");
        let chat = service.rename(chat, "   ").await.unwrap();
        assert_eq!(chat.name, "Trip plans");

        let stored = service.find_by_id(chat.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Trip plans");
    }

    #[tokio::test]
    async fn test_newest_chat_listed_first() {
        let pool = test_pool().await;
        let user = create_confirmed_user(&pool, "a@gmail.com", Some("alice")).await;
        let service = ChatService::new(pool);

        let first = service.create(user.id, "first").await.unwrap();
        let second = service.create(user.id, "second").await.unwrap();

        let chats = service.list_for_user(user.id).await.unwrap();
        assert_eq!(chats[0].id, second.id);
        assert_eq!(chats[1].id, first.id);

        service.delete(second.id).await.unwrap();
        assert_eq!(service.list_for_user(user.id).await.unwrap().len(), 1);
    }

    async fn count(pool: &SqlitePool, table: &str, chat_id: i64) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE chat_id = ?", table))
            .bind(chat_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_delete_removes_messages_and_attachments() {
        let pool = test_pool().await;
        let user = create_confirmed_user(&pool, "a@gmail.com", Some("alice")).await;
        let service = ChatService::new(pool.clone());

        let doomed = service.create(user.id, "doomed").await.unwrap();
        let kept = service.create(user.id, "kept").await.unwrap();

        for chat_id in [doomed.id, kept.id] {
            let message_id: i64 = sqlx::query_scalar(
                "INSERT INTO messages (chat_id, content, sender) VALUES (?, 'hi', 'user') RETURNING id",
            )
            .bind(chat_id)
            .fetch_one(&pool)
            .await
            .unwrap();
            sqlx::query(
                "INSERT INTO attachments (filename, stored_name, user_id, chat_id, message_id) \
                 VALUES ('a.txt', 'abc.txt', ?, ?, ?)",
            )
            .bind(user.id)
            .bind(chat_id)
            .bind(message_id)
            .execute(&pool)
            .await
            .unwrap();
        }

        service.delete(doomed.id).await.unwrap();

        assert_eq!(count(&pool, "messages", doomed.id).await, 0);
        assert_eq!(count(&pool, "attachments", doomed.id).await, 0);
        assert_eq!(count(&pool, "messages", kept.id).await, 1);
        assert_eq!(count(&pool, "attachments", kept.id).await, 1);
    }
}
