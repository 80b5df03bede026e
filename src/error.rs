use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Every failure a handler can surface to a caller.
///
/// Status and body are derived by pure functions so the mapping can be
/// checked without a running router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Missing file_url")]
    MissingFileUrl,
    #[error("Invalid file_url")]
    InvalidFileUrl,
    #[error("No file uploaded")]
    NoFile,
    #[error("Unsupported file type. Upload a PDF or image.")]
    UnsupportedFileType,
    #[error("File too large (max {max_mb}MB)")]
    FileTooLarge { max_mb: usize },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Failed to fetch PDF ({0})")]
    UpstreamStatus(u16),
    #[error("Failed to parse document")]
    ParseFailed,
    #[error("Failed to process file")]
    ProcessingFailed(String),
    #[error("Not found")]
    NotFound,
    #[error("Unexpected error")]
    Unexpected,
}

impl ApiError {
    pub fn file_too_large(max_bytes: usize) -> Self {
        ApiError::FileTooLarge {
            max_mb: max_bytes / (1024 * 1024),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFileUrl
            | ApiError::InvalidFileUrl
            | ApiError::NoFile
            | ApiError::UnsupportedFileType
            | ApiError::FileTooLarge { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            ApiError::ParseFailed | ApiError::ProcessingFailed(_) | ApiError::Unexpected => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Only the OCR processing failure exposes the underlying detail.
    pub fn body(&self) -> Value {
        match self {
            ApiError::ProcessingFailed(message) => json!({
                "error": self.to_string(),
                "message": message,
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}
