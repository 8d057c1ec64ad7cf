use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::AppError;

/// Stores uploads in a single directory under randomized names.
///
/// Original filenames and content types live only in the database.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_dir_exists(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create upload directory '{}': {}",
                self.root.display(),
                e
            ))
        })?;
        info!("Upload directory ready: {}", self.root.display());
        Ok(())
    }

    /// Generate a collision-free stored name keeping the original extension
    pub fn generate_key(&self, original_filename: &str) -> String {
        let extension = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        format!("{}{}", Uuid::new_v4().simple(), extension)
    }

    /// Absolute location of a stored file. Only the final path component of
    /// `key` is used, so keys can never escape the upload directory.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name = Path::new(key)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.root.join(name)
    }

    pub async fn upload(&self, key: &str, data: &[u8]) -> Result<PathBuf, AppError> {
        let path = self.path_for(key);
        tokio::fs::write(&path, data).await.map_err(|e| {
            AppError::Internal(format!("Failed to store file '{}': {}", key, e))
        })?;
        debug!("Stored upload {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    pub async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(AppError::Internal(format!(
                "Failed to read file '{}': {}",
                key, e
            ))),
        }
    }
}

/// Reduce a client-supplied filename to a safe ASCII name.
///
/// Path separators become spaces, whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped and leading dots/underscores are stripped.
/// Returns `"unnamed"` when nothing survives.
pub fn sanitize_filename(filename: &str) -> String {
    let replaced = filename.replace(['/', '\\'], " ");
    let joined = replaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = filtered.trim_start_matches(['.', '_']).to_string();

    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed
    }
}
