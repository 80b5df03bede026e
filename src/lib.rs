//! HTTP service that pulls plain text out of PDFs and images.
//!
//! `POST /parse` fetches a remote PDF by URL; `POST /api/ocr` accepts a
//! multipart upload and routes it to PDF text extraction or OCR based on
//! the declared content type.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod routes;

pub use config::Config;
pub use error::ApiError;
pub use routes::{router, serve, AppState};
