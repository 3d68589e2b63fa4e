// src/services/pdf.rs

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tokio::{fs, process::Command};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("the uploaded file is not a PDF")]
    NotAPdf,
    #[error("failed to stage the upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdftotext failed: {0}")]
    Extraction(String),
    #[error("pdftotext timed out")]
    Timeout,
}

/// Extracts text from uploaded PDFs with poppler's `pdftotext`.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    bin: String,
    timeout: Duration,
}

impl PdfExtractor {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self { bin: bin.into(), timeout }
    }

    pub async fn extract_text(&self, bytes: &[u8]) -> Result<String, PdfError> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(PdfError::NotAPdf);
        }

        let path: PathBuf = std::env::temp_dir().join(format!("qmaster-{}.pdf", uuid::Uuid::new_v4()));
        fs::write(&path, bytes).await?;

        let result = self.run(&path).await;

        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!("Failed to remove staged PDF {:?}: {}", path, e);
        }
        result
    }

    async fn run(&self, path: &Path) -> Result<String, PdfError> {
        let output = Command::new(&self.bin)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| PdfError::Timeout)?
            .map_err(|e| PdfError::Extraction(format!("could not run {}: {}", self.bin, e)))?;

        if !output.status.success() {
            return Err(PdfError::Extraction(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        tracing::info!("Extracted PDF content length: {} characters", text.chars().count());
        Ok(text)
    }
}
