pub mod language;
pub mod ocr;
pub mod pdf;
pub mod reader;

pub use language::{OcrLanguage, detect_language, resolve_ocr_language};
pub use ocr::{OcrEngine, TesseractEngine};
pub use pdf::{LopdfTextLayer, PageRasterizer, PdftoppmRasterizer, TextLayer};
pub use reader::{DocumentFormat, FileReader};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Number of leading bytes sampled for language identification.
const LANGUAGE_SAMPLE_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Directory that holds transient page images.
    pub temp_dir: PathBuf,
    /// OCR language used when detection fails or is unsupported.
    pub fallback_language: OcrLanguage,
}

/// Text extraction with OCR fallback.
///
/// Every entry point returns plain text and never an error: failures are
/// logged and degrade to an empty string.
pub struct Extractor {
    config: ExtractorConfig,
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn PageRasterizer>,
    ocr: Box<dyn OcrEngine>,
}

impl Extractor {
    pub fn new(
        config: ExtractorConfig,
        text_layer: Box<dyn TextLayer>,
        rasterizer: Box<dyn PageRasterizer>,
        ocr: Box<dyn OcrEngine>,
    ) -> Self {
        Self {
            config,
            text_layer,
            rasterizer,
            ocr,
        }
    }

    /// Extractor wired to lopdf, `pdftoppm` and `tesseract`.
    pub fn with_system_tools(config: ExtractorConfig) -> Self {
        Self::new(
            config,
            Box::new(LopdfTextLayer),
            Box::new(PdftoppmRasterizer::default()),
            Box::new(TesseractEngine::default()),
        )
    }

    /// Extract text from `path` according to its format.
    pub async fn extract(&self, path: &Path, format: DocumentFormat) -> String {
        match format {
            DocumentFormat::Text => FileReader::read_text(path).await,
            DocumentFormat::Pdf => self.extract_pdf(path).await,
            DocumentFormat::Image => self.extract_image(path).await,
            DocumentFormat::Unknown => {
                debug!(file = %path.display(), "Unknown format, nothing extracted");
                String::new()
            }
        }
    }

    async fn extract_pdf(&self, path: &Path) -> String {
        let pages = match self.text_layer.page_texts(path) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read PDF text layer");
                return String::new();
            }
        };

        let mut language = None;
        let mut texts = Vec::with_capacity(pages.len());

        for (index, native) in pages.iter().enumerate() {
            let native = native.trim();
            if !native.is_empty() {
                texts.push(native.to_string());
                continue;
            }

            let page_number = index as u32 + 1;
            let lang = match language {
                Some(lang) => lang,
                None => {
                    let lang = self.ocr_language(path).await;
                    language = Some(lang);
                    lang
                }
            };

            info!(file = %path.display(), page = page_number, "Page has no text layer, running OCR");
            texts.push(self.ocr_page(path, page_number, lang).await);
        }

        texts.join("\n").trim().to_string()
    }

    async fn extract_image(&self, path: &Path) -> String {
        let language = self.ocr_language(path).await;

        match self.ocr.recognize(path, language).await {
            Ok(fragments) => fragments.join(" ").trim().to_string(),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "OCR failed on image");
                String::new()
            }
        }
    }

    /// Pick the OCR language for one input from a sample of its raw bytes.
    async fn ocr_language(&self, path: &Path) -> OcrLanguage {
        let sample = FileReader::read_sample(path, LANGUAGE_SAMPLE_BYTES).await;
        let language = resolve_ocr_language(sample.as_deref(), self.config.fallback_language);
        debug!(file = %path.display(), %language, "Resolved OCR language");
        language
    }

    /// Rasterize one page into a scoped scratch directory and OCR it.
    /// The scratch directory is removed on every path out of this function.
    async fn ocr_page(&self, pdf: &Path, page_number: u32, language: OcrLanguage) -> String {
        let scratch = match tempfile::Builder::new()
            .prefix("page-")
            .tempdir_in(&self.config.temp_dir)
        {
            Ok(dir) => dir,
            Err(e) => {
                warn!(dir = %self.config.temp_dir.display(), error = %e, "Failed to create scratch directory");
                return String::new();
            }
        };

        let image = scratch.path().join(format!("page-{}.png", page_number));
        let text = match self.recognize_page(pdf, page_number, &image, language).await {
            Ok(fragments) => fragments.join(" ").trim().to_string(),
            Err(e) => {
                warn!(file = %pdf.display(), page = page_number, error = %e, "OCR fallback failed");
                String::new()
            }
        };

        if let Err(e) = scratch.close() {
            warn!(error = %e, "Failed to remove page scratch directory");
        }

        text
    }

    async fn recognize_page(
        &self,
        pdf: &Path,
        page_number: u32,
        image: &Path,
        language: OcrLanguage,
    ) -> Result<Vec<String>> {
        self.rasterizer
            .rasterize(pdf, page_number, image)
            .await
            .context("Failed to rasterize page")?;

        self.ocr
            .recognize(image, language)
            .await
            .context("Failed to recognize page image")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FixedTextLayer(Option<Vec<&'static str>>);

    impl TextLayer for FixedTextLayer {
        fn page_texts(&self, _path: &Path) -> Result<Vec<String>> {
            match &self.0 {
                Some(pages) => Ok(pages.iter().map(|p| p.to_string()).collect()),
                None => anyhow::bail!("corrupt PDF"),
            }
        }
    }

    #[derive(Default)]
    struct RecordingRasterizer {
        pages: Arc<Mutex<Vec<u32>>>,
        fail: bool,
    }

    #[async_trait]
    impl PageRasterizer for RecordingRasterizer {
        async fn rasterize(&self, _pdf: &Path, page_number: u32, output: &Path) -> Result<()> {
            self.pages.lock().unwrap().push(page_number);
            if self.fail {
                anyhow::bail!("render failed");
            }
            std::fs::write(output, b"png")?;
            Ok(())
        }
    }

    struct FakeOcr {
        fragments: Option<Vec<&'static str>>,
    }

    impl FakeOcr {
        fn returning(fragments: Vec<&'static str>) -> Self {
            Self { fragments: Some(fragments) }
        }

        fn failing() -> Self {
            Self { fragments: None }
        }
    }

    #[async_trait]
    impl OcrEngine for FakeOcr {
        async fn recognize(&self, image: &Path, _language: OcrLanguage) -> Result<Vec<String>> {
            assert!(image.exists(), "OCR input must exist while recognizing");
            match &self.fragments {
                Some(f) => Ok(f.iter().map(|s| s.to_string()).collect()),
                None => anyhow::bail!("ocr crashed"),
            }
        }
    }

    fn extractor(
        temp: &Path,
        pages: Option<Vec<&'static str>>,
        rasterizer: RecordingRasterizer,
        ocr: FakeOcr,
    ) -> Extractor {
        Extractor::new(
            ExtractorConfig {
                temp_dir: temp.to_path_buf(),
                fallback_language: OcrLanguage::German,
            },
            Box::new(FixedTextLayer(pages)),
            Box::new(rasterizer),
            Box::new(ocr),
        )
    }

    fn scratch_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_blank_page_falls_back_to_ocr() {
        let work = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let pdf = work.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let extractor = extractor(
            temp.path(),
            Some(vec!["   \n", "Native text\n"]),
            RecordingRasterizer::default(),
            FakeOcr::returning(vec!["Scanned", "page"]),
        );

        let text = extractor.extract(&pdf, DocumentFormat::Pdf).await;
        assert_eq!(text, "Scanned page\nNative text");
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_ocr_failure_still_cleans_scratch() {
        let work = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let pdf = work.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let extractor = extractor(
            temp.path(),
            Some(vec!["", "Second"]),
            RecordingRasterizer::default(),
            FakeOcr::failing(),
        );

        assert_eq!(extractor.extract(&pdf, DocumentFormat::Pdf).await, "Second");
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_rasterizer_failure_degrades_to_empty() {
        let work = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let pdf = work.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let extractor = extractor(
            temp.path(),
            Some(vec![" "]),
            RecordingRasterizer { fail: true, ..Default::default() },
            FakeOcr::returning(vec!["never"]),
        );

        assert_eq!(extractor.extract(&pdf, DocumentFormat::Pdf).await, "");
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_only_blank_pages_are_rasterized() {
        let work = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let pdf = work.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let rasterizer = RecordingRasterizer::default();
        let rasterized = rasterizer.pages.clone();
        let extractor = Extractor::new(
            ExtractorConfig {
                temp_dir: temp.path().to_path_buf(),
                fallback_language: OcrLanguage::German,
            },
            Box::new(FixedTextLayer(Some(vec!["one", "", "three", "\t"]))),
            Box::new(rasterizer),
            Box::new(FakeOcr::returning(vec!["ocr"])),
        );

        let text = extractor.extract(&pdf, DocumentFormat::Pdf).await;
        assert_eq!(text, "one\nocr\nthree\nocr");
        assert_eq!(*rasterized.lock().unwrap(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let extractor = extractor(
            temp.path(),
            None,
            RecordingRasterizer::default(),
            FakeOcr::returning(vec![]),
        );

        let text = extractor.extract(Path::new("broken.pdf"), DocumentFormat::Pdf).await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_image_ocr_joins_and_trims() {
        let work = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let image = work.path().join("IMG_5230.jpeg");
        std::fs::write(&image, b"\xff\xd8\xff\xe0").unwrap();

        let extractor = extractor(
            temp.path(),
            Some(vec![]),
            RecordingRasterizer::default(),
            FakeOcr::returning(vec![" Rechnung", "Nr. 7 "]),
        );

        let text = extractor.extract(&image, DocumentFormat::Image).await;
        assert_eq!(text, "Rechnung Nr. 7");
    }

    #[tokio::test]
    async fn test_image_ocr_failure_is_empty() {
        let work = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let image = work.path().join("photo.png");
        std::fs::write(&image, b"\x89PNG").unwrap();

        let extractor = extractor(temp.path(), Some(vec![]), RecordingRasterizer::default(), FakeOcr::failing());
        assert!(extractor.extract(&image, DocumentFormat::Image).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_format_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let extractor = extractor(
            temp.path(),
            Some(vec!["text"]),
            RecordingRasterizer::default(),
            FakeOcr::returning(vec!["text"]),
        );

        let text = extractor.extract(Path::new("notes.docx"), DocumentFormat::Unknown).await;
        assert!(text.is_empty());
    }
}
