use crate::language::OcrLanguage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Text recognition over a single image.
///
/// Returns recognized fragments in reading order.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path, language: OcrLanguage) -> Result<Vec<String>>;
}

/// OCR backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &Path, language: OcrLanguage) -> Result<Vec<String>> {
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", language.tesseract_code()])
            .output()
            .await
            .context(format!("Failed to run {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} failed on {:?}: {}",
                self.binary,
                image,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(fragments(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Split raw recognizer output into its non-blank lines.
fn fragments(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
