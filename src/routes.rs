//! HTTP surface: router assembly, handlers and cross-cutting layers.

use std::{any::Any, sync::Arc};

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Request, State,
    },
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::ApiError,
    extract::{Extractors, PdfTextExtractor, TesseractOcr},
    fetch::{self, DocumentFetcher, FetchError},
    models::{OcrResponse, ParseRequest, ParseResponse, UploadKind},
};

pub const API_KEY_HEADER: &str = "x-api-key";
const SERVICE_NAME: &str = "docparse-api";
const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";
/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// ── State ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: DocumentFetcher,
    pub extractors: Extractors,
}

impl AppState {
    /// Production collaborators: `pdf-extract` for PDFs, Tesseract for images.
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let ocr = TesseractOcr::new(config.ocr_language.clone(), config.tessdata_dir.clone());
        let extractors = Extractors::new(Arc::new(PdfTextExtractor), Arc::new(ocr));
        Self::with_extractors(config, extractors)
    }

    pub fn with_extractors(config: Config, extractors: Extractors) -> Result<Self, FetchError> {
        let fetcher = DocumentFetcher::new(config.fetch_insecure_tls)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractors,
        })
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let protected = Router::new()
        .route("/parse", post(parse_document))
        .route("/api/ocr", post(ocr_upload))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(health))
        .route("/healthz", get(health))
        .merge(protected)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.trim() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();
    tracing::info!("CORS configured with {} allowed origin(s)", origins.len());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(%detail, "handler panicked");
    ApiError::Unexpected.into_response()
}

// ── Middleware ───────────────────────────────────────────────────────────────

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(expected) = state.config.api_key.as_deref() {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());

        if provided != Some(expected) {
            tracing::warn!(path = %req.uri().path(), "missing or invalid API key");
            return ApiError::Unauthorized.into_response();
        }
    }
    next.run(req).await
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /healthz",
            "parse": "POST /parse",
            "ocr": "POST /api/ocr",
        },
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// POST /parse: fetch a remote PDF and return its trimmed text layer.
async fn parse_document(
    State(state): State<AppState>,
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<ParseResponse>, ApiError> {
    let file_url = payload
        .ok()
        .and_then(|Json(req)| req.file_url)
        .filter(|url| !url.trim().is_empty())
        .ok_or(ApiError::MissingFileUrl)?;

    let url = fetch::validate_url(&file_url).ok_or_else(|| {
        tracing::warn!(endpoint = "/parse", %file_url, "rejected non-http(s) file_url");
        ApiError::InvalidFileUrl
    })?;

    let bytes = state.fetcher.fetch(&url).await.map_err(|e| {
        tracing::error!(endpoint = "/parse", %url, error = %e, "document fetch failed");
        match e {
            FetchError::Status(status) => ApiError::UpstreamStatus(status),
            FetchError::Request(_) => ApiError::ParseFailed,
        }
    })?;

    let result = state.extractors.pdf_text(bytes).await.map_err(|e| {
        tracing::error!(endpoint = "/parse", %url, error = %e, "PDF extraction failed");
        ApiError::ParseFailed
    })?;
    tracing::info!(
        endpoint = "/parse",
        source = ?result.source_type,
        chars = result.text.len(),
        "document parsed"
    );

    Ok(Json(ParseResponse {
        extracted_text: result.text.trim().to_string(),
    }))
}

/// POST /api/ocr: text layer for PDFs, OCR for images.
async fn ocr_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let max_bytes = state.config.max_upload_bytes;
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!(endpoint = "/api/ocr", error = %e, "request is not multipart");
        ApiError::NoFile
    })?;

    let upload = read_file_field(&mut multipart, max_bytes)
        .await?
        .ok_or(ApiError::NoFile)?;

    let result = match UploadKind::from_content_type(&upload.content_type) {
        UploadKind::Pdf => state.extractors.pdf_text(upload.bytes).await,
        UploadKind::Image => state.extractors.image_text(upload.bytes).await,
        UploadKind::Unsupported => {
            tracing::warn!(
                endpoint = "/api/ocr",
                content_type = %upload.content_type,
                "unsupported upload type"
            );
            return Err(ApiError::UnsupportedFileType);
        }
    }
    .map_err(|e| {
        tracing::error!(
            endpoint = "/api/ocr",
            content_type = %upload.content_type,
            error = %e,
            "file processing failed"
        );
        ApiError::ProcessingFailed(e.to_string())
    })?;

    tracing::info!(
        endpoint = "/api/ocr",
        source = ?result.source_type,
        chars = result.text.len(),
        "upload processed"
    );

    Ok(Json(OcrResponse {
        success: true,
        text: result.text,
        file_type: upload.content_type,
    }))
}

// ── Upload parsing ───────────────────────────────────────────────────────────

struct Upload {
    content_type: String,
    bytes: axum::body::Bytes,
}

/// Takes the first `file` field; other fields are skipped.
async fn read_file_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_UPLOAD_CONTENT_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        if bytes.len() > max_bytes {
            tracing::warn!(endpoint = "/api/ocr", size = bytes.len(), "upload exceeds limit");
            return Err(ApiError::file_too_large(max_bytes));
        }

        return Ok(Some(Upload {
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(endpoint = "/api/ocr", "upload exceeds body limit");
        ApiError::file_too_large(max_bytes)
    } else {
        tracing::warn!(endpoint = "/api/ocr", error = %err, "malformed multipart body");
        ApiError::NoFile
    }
}

// ── Serving ──────────────────────────────────────────────────────────────────

pub async fn serve(config: Config) -> std::io::Result<()> {
    let addr = config.socket_addr();
    if config.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!("No OCR_API_KEY set, running without authentication");
    }
    tracing::info!("Upload size limit: {} bytes", config.max_upload_bytes);

    let state = AppState::new(config).map_err(std::io::Error::other)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
