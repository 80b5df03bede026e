//! Process-wide settings, read once from the environment at startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::http::HeaderValue;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// When `None` the API-key guard lets every request through.
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub ocr_language: String,
    pub tessdata_dir: Option<String>,
    pub fetch_insecure_tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            api_key: None,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            tessdata_dir: None,
            fetch_insecure_tls: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let host = parse_env("HOST").unwrap_or(defaults.host);
        let port = parse_env("PORT").unwrap_or(defaults.port);
        let max_upload_bytes = parse_env::<usize>("MAX_UPLOAD_BYTES")
            .filter(|&bytes| {
                if bytes == 0 {
                    tracing::warn!("MAX_UPLOAD_BYTES must be > 0, using default");
                }
                bytes > 0
            })
            .unwrap_or(defaults.max_upload_bytes);

        let api_key = non_empty_env("OCR_API_KEY");

        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(raw) => {
                let origins = parse_origins(&raw);
                if origins.is_empty() {
                    tracing::warn!("CORS_ORIGINS set but empty/invalid, using default allow-list");
                    defaults.cors_origins
                } else {
                    origins
                }
            }
            Err(_) => defaults.cors_origins,
        };

        Self {
            host,
            port,
            api_key,
            cors_origins,
            max_upload_bytes,
            ocr_language: non_empty_env("OCR_LANG").unwrap_or(defaults.ocr_language),
            tessdata_dir: non_empty_env("TESSDATA_PREFIX"),
            fetch_insecure_tls: std::env::var("DOCPARSE_INSECURE_SSL").as_deref() == Ok("1"),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_env(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Failed to parse {}='{}', using default", name, raw);
            None
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| {
            if *s == "*" {
                tracing::warn!("Wildcard CORS origin is not supported, list origins explicitly");
                return false;
            }
            let ok = s.parse::<HeaderValue>().is_ok();
            if !ok {
                tracing::warn!("Skipping invalid CORS origin '{}'", s);
            }
            ok
        })
        .map(str::to_string)
        .collect()
}
