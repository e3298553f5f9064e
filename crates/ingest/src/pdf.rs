use anyhow::{Context, Result};
use async_trait::async_trait;
use lopdf::Document;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Resolution used when a page has to be rasterized for OCR.
const RASTER_DPI: u32 = 200;

/// Native (embedded) text layer of a PDF.
pub trait TextLayer: Send + Sync {
    /// Text of every page, in page order. A page whose text cannot be
    /// decoded is returned as an empty string.
    fn page_texts(&self, path: &Path) -> Result<Vec<String>>;
}

/// Renders a single PDF page to a PNG image.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render page `page_number` (1-based) of `pdf` into the PNG file `output`.
    async fn rasterize(&self, pdf: &Path, page_number: u32, output: &Path) -> Result<()>;
}

/// Text layer read with lopdf.
#[derive(Debug, Default, Clone)]
pub struct LopdfTextLayer;

impl TextLayer for LopdfTextLayer {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>> {
        let doc = Document::load(path).context(format!("Failed to load PDF: {:?}", path))?;

        // BTreeMap keyed by 1-based page number, already in page order
        let pages = doc.get_pages();
        let texts = pages
            .keys()
            .map(|page_num| match doc.extract_text(&[*page_num]) {
                Ok(text) => text,
                Err(e) => {
                    debug!(file = %path.display(), page = page_num, error = %e, "No native text for page");
                    String::new()
                }
            })
            .collect();

        Ok(texts)
    }
}

/// Rasterizer backed by Poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: String,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &Path, page_number: u32, output: &Path) -> Result<()> {
        // pdftoppm appends ".png" to the prefix it is given
        let prefix = output.with_extension("");
        let page = page_number.to_string();

        let status = Command::new(&self.binary)
            .args(["-png", "-singlefile", "-r", &RASTER_DPI.to_string()])
            .args(["-f", &page, "-l", &page])
            .arg(pdf)
            .arg(&prefix)
            .status()
            .await
            .context(format!("Failed to run {}", self.binary))?;

        if !status.success() {
            anyhow::bail!("{} failed on page {} of {:?}: {}", self.binary, page_number, pdf, status);
        }

        if !output.exists() {
            anyhow::bail!("{} produced no image at {:?}", self.binary, output);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        assert!(LopdfTextLayer.page_texts(&path).is_err());
        assert!(LopdfTextLayer.page_texts(&dir.path().join("missing.pdf")).is_err());
    }

    #[tokio::test]
    async fn test_missing_rasterizer_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = PdftoppmRasterizer::new("definitely-not-pdftoppm");
        let result = rasterizer
            .rasterize(Path::new("scan.pdf"), 1, &dir.path().join("page.png"))
            .await;
        assert!(result.is_err());
    }
}
