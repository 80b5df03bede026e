use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParseResponse {
    pub extracted_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Image,
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub source_type: SourceType,
}

/// How an upload is handled, decided from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Image,
    Unsupported,
}

impl UploadKind {
    /// Parameters and case are ignored: `Image/PNG; foo=bar` is an image.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.split_once('/') {
            Some(("application", "pdf")) => UploadKind::Pdf,
            Some(("image", subtype)) if !subtype.is_empty() => UploadKind::Image,
            _ => UploadKind::Unsupported,
        }
    }
}
