use axum::body::Bytes;
use url::Url;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "docparse-api/0.1";
const MAX_REDIRECTS: usize = 10;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("{0}")]
    Request(String),
}

// ── Fetcher ──────────────────────────────────────────────────────────────────

/// Performs a single GET per document. No retries, no service-side timeout.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: reqwest::Client,
}

impl DocumentFetcher {
    pub fn new(insecure_tls: bool) -> Result<Self, FetchError> {
        let mut builder = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT);

        if insecure_tls {
            tracing::warn!("TLS certificate verification disabled for document fetches");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Request(format!("TimeoutError: {}", e))
            } else if e.is_connect() {
                FetchError::Request(format!("ConnectError: {}", e))
            } else {
                FetchError::Request(format!("RequestError: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}

// ── URL validation ───────────────────────────────────────────────────────────

/// Only absolute http(s) URLs are fetched.
pub fn validate_url(raw: &str) -> Option<Url> {
    let parsed = Url::parse(raw.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn spawn_upstream() -> std::net::SocketAddr {
        let app = Router::new()
            .route("/doc.pdf", get(|| async { "%PDF-1.4 fake" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn accepts_only_http_urls() {
        assert!(validate_url("https://example.com/a.pdf").is_some());
        assert!(validate_url(" http://example.com/a.pdf ").is_some());
        assert!(validate_url("ftp://example.com/a.pdf").is_none());
        assert!(validate_url("file:///etc/passwd").is_none());
        assert!(validate_url("not a url").is_none());
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let addr = spawn_upstream().await;
        let fetcher = DocumentFetcher::new(false).unwrap();
        let url = Url::parse(&format!("http://{}/doc.pdf", addr)).unwrap();

        let bytes = fetcher.fetch(&url).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn surfaces_non_success_status() {
        let addr = spawn_upstream().await;
        let fetcher = DocumentFetcher::new(false).unwrap();
        let url = Url::parse(&format!("http://{}/missing", addr)).unwrap();

        match fetcher.fetch(&url).await {
            Err(FetchError::Status(404)) => {}
            other => panic!("expected 404 status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_request_error() {
        let fetcher = DocumentFetcher::new(false).unwrap();
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let url = Url::parse(&format!("http://{}/doc.pdf", addr)).unwrap();

        assert!(matches!(fetcher.fetch(&url).await, Err(FetchError::Request(_))));
    }
}
