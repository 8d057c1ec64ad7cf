use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::core::config::OcrConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR is disabled")]
    Disabled,

    #[error("failed to run OCR engine: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("OCR engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Recognizes text in an encoded image (PNG, JPEG, ...)
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Runs the `tesseract` CLI, feeding the image on stdin and reading text from stdout
pub struct TesseractOcr {
    binary: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Build the configured engine, or one that always declines
    pub fn from_config(config: &OcrConfig) -> Box<dyn OcrEngine> {
        if config.enabled {
            Box::new(Self::new(config.tesseract_path.clone(), config.timeout))
        } else {
            Box::new(DisabledOcr)
        }
    }

    async fn run(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        debug!("Running OCR on {} bytes with {}", image.len(), self.binary);
        timeout(self.timeout, self.run(image))
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))?
    }
}

/// Engine used when OCR is switched off
pub struct DisabledOcr;

#[async_trait]
impl OcrEngine for DisabledOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::Disabled)
    }
}
