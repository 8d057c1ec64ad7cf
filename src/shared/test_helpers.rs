//! Fixtures shared by unit and router tests

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::config::{
    AppConfig, AuthConfig, Config, DatabaseConfig, LlmConfig, MailConfig, OcrConfig,
    StorageConfig,
};
use crate::core::database::run_migrations;
use crate::features::users::{User, UserService};
use crate::modules::mail::mailer::MailError;
use crate::modules::mail::{Mailer, OutgoingEmail};
use crate::shared::llm::client::{CompletionRequest, CompletionResponse, LlmError};
use crate::shared::llm::ChatCompletionClient;

/// A private in-memory database without the schema
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    // One connection that never expires, so every query sees the same database
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("failed to open in-memory database")
}

/// A private in-memory database with all migrations applied
pub async fn test_pool() -> SqlitePool {
    let pool = memory_pool().await;
    run_migrations(&pool).await.expect("migrations failed");
    pool
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        secret_key: "test-secret-key".to_string(),
        session_ttl: Duration::from_secs(7 * 24 * 3600),
        confirm_token_ttl: Duration::from_secs(3600),
        secure_cookies: false,
        bcrypt_cost: 4,
    }
}

pub fn test_llm_config() -> LlmConfig {
    LlmConfig {
        api_key: "test-key".to_string(),
        base_url: "http://127.0.0.1:9/api/v1".to_string(),
        chat_model: "meta-llama/llama-3-8b-instruct".to_string(),
        title_model: "meta-llama/llama-4-maverick".to_string(),
        reply_timeout: Duration::from_secs(30),
        title_timeout: Duration::from_secs(15),
    }
}

/// Full configuration for router tests, storing uploads under `upload_dir`
pub fn test_config(upload_dir: &Path) -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            public_base_url: "http://mirai.test".to_string(),
            max_request_body_size: 1024 * 1024,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        },
        auth: test_auth_config(),
        mail: MailConfig {
            server: None,
            port: 587,
            use_tls: true,
            username: None,
            password: None,
            default_sender: None,
        },
        storage: StorageConfig {
            upload_dir: upload_dir.to_path_buf(),
            allowed_extensions: StorageConfig::parse_extensions("txt,pdf,png,jpg,jpeg,docx"),
        },
        llm: test_llm_config(),
        ocr: OcrConfig {
            enabled: false,
            tesseract_path: "tesseract".to_string(),
            timeout: Duration::from_secs(30),
        },
    }
}

/// Insert a confirmed account with an optional username
pub async fn create_confirmed_user(pool: &SqlitePool, email: &str, username: Option<&str>) -> User {
    let users = UserService::new(pool.clone());
    let hash = bcrypt::hash("secret1", 4).expect("hash failed");
    let user = users.create(email, &hash).await.expect("create user failed");
    users.mark_confirmed(user.id).await.expect("confirm failed");
    if let Some(username) = username {
        users
            .set_username(user.id, username)
            .await
            .expect("set username failed");
    }
    users
        .find_by_id(user.id)
        .await
        .expect("reload failed")
        .expect("user vanished")
}

/// Mailer that keeps every message instead of delivering it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Config("delivery disabled in test".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

enum StubReply {
    Content(String),
    NoChoices,
    Failure,
}

/// Completion client answering every request the same way and recording it
pub struct StubCompletionClient {
    reply: StubReply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletionClient {
    fn new(reply: StubReply) -> Self {
        Self {
            reply,
            requests: Mutex::default(),
        }
    }

    pub fn replying(content: &str) -> Self {
        Self::new(StubReply::Content(content.to_string()))
    }

    pub fn without_choices() -> Self {
        Self::new(StubReply::NoChoices)
    }

    pub fn failing() -> Self {
        Self::new(StubReply::Failure)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatCompletionClient for StubCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);

        let body = match &self.reply {
            StubReply::Content(content) => {
                serde_json::json!({ "choices": [{ "message": { "content": content } }] })
            }
            StubReply::NoChoices => serde_json::json!({ "choices": [] }),
            StubReply::Failure => {
                let err = serde_json::from_str::<serde_json::Value>("<html>")
                    .expect_err("invalid JSON must fail");
                return Err(LlmError::Parse(err));
            }
        };
        Ok(serde_json::from_value(body)?)
    }
}
