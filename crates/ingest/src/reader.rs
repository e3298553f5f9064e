use std::path::Path;
use tokio::fs;
use tracing::warn;

/// File formats the extraction engine knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Image,
    Unknown,
}

impl DocumentFormat {
    /// Classify a file by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "txt" => DocumentFormat::Text,
            "jpg" | "jpeg" | "png" => DocumentFormat::Image,
            _ => DocumentFormat::Unknown,
        }
    }
}

pub struct FileReader;

impl FileReader {
    /// Read a plain text file, trimmed. Any read failure yields an empty string.
    pub async fn read_text(path: &Path) -> String {
        match fs::read_to_string(path).await {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read text file");
                String::new()
            }
        }
    }

    /// Read up to `limit` leading bytes, decoded permissively.
    pub async fn read_sample(path: &Path, limit: usize) -> Option<String> {
        let bytes = fs::read(path).await.ok()?;
        let end = bytes.len().min(limit);
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
