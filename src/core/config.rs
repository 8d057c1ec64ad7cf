use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Absolute base URL used in confirmation links and attachment fallbacks
    pub public_base_url: String,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub secret_key: String,
    pub session_ttl: Duration,
    pub confirm_token_ttl: Duration,
    /// Adds the `Secure` attribute to the session cookie
    pub secure_cookies: bool,
    pub bcrypt_cost: u32,
}

/// SMTP settings. When `server` is unset, confirmation links are only logged.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: Option<String>,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_sender: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Lowercase extensions without the leading dot
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub title_model: String,
    pub reply_timeout: Duration,
    pub title_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub enabled: bool,
    pub tesseract_path: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            mail: MailConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            ocr: OcrConfig::from_env()?,
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 16 * 1024 * 1024; // 16MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            public_base_url,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_URL: &'static str = "sqlite://instance/mirai.db";
    const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env_non_empty("DATABASE_URL").unwrap_or_else(|| Self::DEFAULT_URL.to_string());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl AuthConfig {
    const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 3600; // 7 days
    const DEFAULT_CONFIRM_TOKEN_TTL_SECS: u64 = 3600; // 1 hour

    pub fn from_env() -> Result<Self, String> {
        let secret_key = env_non_empty("SECRET_KEY")
            .ok_or_else(|| "SECRET_KEY environment variable is required".to_string())?;

        let session_ttl_secs = env::var("SESSION_TTL_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_SESSION_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "SESSION_TTL_SECS must be a valid number".to_string())?;

        let confirm_token_ttl_secs = env::var("CONFIRM_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_CONFIRM_TOKEN_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "CONFIRM_TOKEN_TTL_SECS must be a valid number".to_string())?;

        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
            .parse::<u32>()
            .map_err(|_| "BCRYPT_COST must be a valid number".to_string())?;

        Ok(Self {
            secret_key,
            session_ttl: Duration::from_secs(session_ttl_secs),
            confirm_token_ttl: Duration::from_secs(confirm_token_ttl_secs),
            secure_cookies: env_bool("SESSION_COOKIE_SECURE", false),
            bcrypt_cost,
        })
    }
}

impl MailConfig {
    const DEFAULT_PORT: u16 = 587;

    pub fn from_env() -> Result<Self, String> {
        let port = env::var("MAIL_PORT")
            .unwrap_or_else(|_| Self::DEFAULT_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| "MAIL_PORT must be a valid port number".to_string())?;

        Ok(Self {
            server: env_non_empty("MAIL_SERVER"),
            port,
            use_tls: env_bool("MAIL_USE_TLS", true),
            username: env_non_empty("MAIL_USERNAME"),
            password: env_non_empty("MAIL_PASSWORD"),
            default_sender: env_non_empty("MAIL_DEFAULT_SENDER"),
        })
    }

    /// Sender address: explicit default sender, else the SMTP username
    pub fn sender(&self) -> Option<&str> {
        self.default_sender
            .as_deref()
            .or(self.username.as_deref())
    }
}

impl StorageConfig {
    const DEFAULT_UPLOAD_DIR: &'static str = "instance/uploads";
    const DEFAULT_ALLOWED_EXTENSIONS: &'static str = "png,jpg,jpeg,gif,pdf,txt,doc,docx";

    pub fn from_env() -> Result<Self, String> {
        let upload_dir = PathBuf::from(
            env_non_empty("UPLOAD_DIR").unwrap_or_else(|| Self::DEFAULT_UPLOAD_DIR.to_string()),
        );

        let allowed_extensions = Self::parse_extensions(
            &env::var("ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| Self::DEFAULT_ALLOWED_EXTENSIONS.to_string()),
        );

        if allowed_extensions.is_empty() {
            return Err("ALLOWED_EXTENSIONS must list at least one extension".to_string());
        }

        Ok(Self {
            upload_dir,
            allowed_extensions,
        })
    }

    pub fn parse_extensions(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl LlmConfig {
    const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";
    const DEFAULT_CHAT_MODEL: &'static str = "meta-llama/llama-3-8b-instruct";
    const DEFAULT_TITLE_MODEL: &'static str = "meta-llama/llama-4-maverick";
    const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_TITLE_TIMEOUT_SECS: u64 = 15;

    pub fn from_env() -> Result<Self, String> {
        // A missing key is not fatal: every call then degrades to the fallback text
        let api_key = env::var("OPENROUTER_API_KEY").unwrap_or_default();

        let base_url = env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let reply_timeout_secs = env::var("LLM_REPLY_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_REPLY_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "LLM_REPLY_TIMEOUT_SECS must be a valid number".to_string())?;

        let title_timeout_secs = env::var("LLM_TITLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TITLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "LLM_TITLE_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            api_key,
            base_url,
            chat_model: env::var("LLM_CHAT_MODEL")
                .unwrap_or_else(|_| Self::DEFAULT_CHAT_MODEL.to_string()),
            title_model: env::var("LLM_TITLE_MODEL")
                .unwrap_or_else(|_| Self::DEFAULT_TITLE_MODEL.to_string()),
            reply_timeout: Duration::from_secs(reply_timeout_secs),
            title_timeout: Duration::from_secs(title_timeout_secs),
        })
    }
}

impl OcrConfig {
    const DEFAULT_TESSERACT_PATH: &'static str = "tesseract";
    const DEFAULT_TIMEOUT_SECS: u64 = 20;

    pub fn from_env() -> Result<Self, String> {
        let timeout_secs = env::var("OCR_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "OCR_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            enabled: env_bool("OCR_ENABLED", true),
            tesseract_path: env::var("TESSERACT_PATH")
                .unwrap_or_else(|_| Self::DEFAULT_TESSERACT_PATH.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
