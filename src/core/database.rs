use crate::core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Outcome of the startup check on `attachments.message_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaPatch {
    AlreadyPresent,
    Added,
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // File-backed databases need their directory before the first connect
    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
    if !in_memory {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Make sure `attachments.message_id` exists, adding it to databases created
/// before attachments could be linked to messages. Safe to call repeatedly.
pub async fn ensure_attachment_message_id(pool: &SqlitePool) -> Result<SchemaPatch, sqlx::Error> {
    let columns: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('attachments')")
            .fetch_all(pool)
            .await?;

    if columns.iter().any(|c| c == "message_id") {
        tracing::debug!("Column 'message_id' already exists in table 'attachments'");
        return Ok(SchemaPatch::AlreadyPresent);
    }

    tracing::warn!("Column 'message_id' missing in 'attachments', adding it");
    sqlx::query(
        "ALTER TABLE attachments ADD COLUMN message_id INTEGER REFERENCES messages(id) ON DELETE SET NULL",
    )
    .execute(pool)
    .await?;
    tracing::info!("Column 'message_id' added to 'attachments'");

    Ok(SchemaPatch::Added)
}
