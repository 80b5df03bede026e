//! PDF text extraction and image OCR.
//!
//! Both collaborators are synchronous, CPU-bound libraries. They sit behind
//! small traits so the router can be exercised with fakes, and every call is
//! moved onto the blocking pool where a panic inside the library becomes an
//! ordinary [`ExtractError`].

use std::sync::Arc;

use axum::body::Bytes;

use crate::models::{ExtractionResult, SourceType};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("{0}")]
    Failed(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("extraction task panicked: {0}")]
    Panicked(String),
}

// ── Collaborator traits ──────────────────────────────────────────────────────

pub trait TextExtractor: Send + Sync + 'static {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractError>;
}

pub trait OcrEngine: Send + Sync + 'static {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractError>;
}

// ── PDF ──────────────────────────────────────────────────────────────────────

/// Reads the embedded text layer with `pdf-extract`. Scanned pages without
/// a text layer yield empty text rather than an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(pdf)
            .map_err(|e| ExtractError::Failed(format!("failed to extract text from PDF: {}", e)))
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    datapath: Option<String>,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>, datapath: Option<String>) -> Self {
        Self {
            language: language.into(),
            datapath,
        }
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractError> {
        let mut tess = tesseract::Tesseract::new(self.datapath.as_deref(), Some(self.language.as_str()))
            .map_err(|e| ExtractError::Unavailable(format!("Tesseract init: {}", e)))?
            .set_image_from_mem(image)
            .map_err(|e| ExtractError::Failed(format!("Tesseract image: {}", e)))?
            .recognize()
            .map_err(|e| ExtractError::Failed(format!("Tesseract recognize: {}", e)))?;

        tess.get_text()
            .map_err(|e| ExtractError::Failed(format!("OCR text: {}", e)))
    }
}

#[cfg(not(feature = "tesseract"))]
impl OcrEngine for TesseractOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, ExtractError> {
        tracing::debug!(
            language = %self.language,
            datapath = ?self.datapath,
            "OCR requested but the tesseract feature is disabled"
        );
        Err(ExtractError::Unavailable(
            "OCR engine not available: built with --no-default-features (enable the `tesseract` feature)"
                .to_string(),
        ))
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Extractors {
    pub pdf: Arc<dyn TextExtractor>,
    pub ocr: Arc<dyn OcrEngine>,
}

impl Extractors {
    pub fn new(pdf: Arc<dyn TextExtractor>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }

    pub async fn pdf_text(&self, bytes: Bytes) -> Result<ExtractionResult, ExtractError> {
        let pdf = Arc::clone(&self.pdf);
        let text = run_blocking(move || pdf.extract_text(&bytes)).await?;
        Ok(ExtractionResult {
            text,
            source_type: SourceType::Pdf,
        })
    }

    pub async fn image_text(&self, bytes: Bytes) -> Result<ExtractionResult, ExtractError> {
        let ocr = Arc::clone(&self.ocr);
        let text = run_blocking(move || ocr.recognize(&bytes)).await?;
        Ok(ExtractionResult {
            text,
            source_type: SourceType::Image,
        })
    }
}

async fn run_blocking<F>(job: F) -> Result<String, ExtractError>
where
    F: FnOnce() -> Result<String, ExtractError> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExtractError::Panicked(message))
        }
        Err(e) => Err(ExtractError::Failed(format!("Task join error: {}", e))),
    }
}
