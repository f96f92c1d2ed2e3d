//! Adapter interfaces for external systems.
//!
//! The remote file host is reached through the [`Transport`] trait so the
//! prober and fetcher can run against scripted responses in tests.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

// Re-export the HTTP transport
pub use http::HttpTransport;

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Incrementally readable response body
#[async_trait]
pub trait ResponseBody: Send {
    /// Next chunk of the body, `None` at end of stream
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Status, declared content type and streamed body of a GET
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,

    /// Declared `Content-Type` header (if any)
    pub content_type: Option<String>,

    /// Final URL after redirects
    pub url: String,

    /// Streamed body
    pub body: Box<dyn ResponseBody>,
}

impl TransportResponse {
    /// Build a response over an in-memory body
    pub fn from_bytes(
        url: impl Into<String>,
        status: u16,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            url: url.into(),
            body: Box::new(MemoryBody::new(body)),
        }
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Body served from memory in fixed-size chunks
pub struct MemoryBody {
    data: Vec<u8>,
    offset: usize,
}

impl MemoryBody {
    const CHUNK: usize = 4096;

    pub fn new(data: Vec<u8>) -> Self {
        Self { data, offset: 0 }
    }
}

#[async_trait]
impl ResponseBody for MemoryBody {
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + Self::CHUNK).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}

/// Trait for reaching the remote host
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Header-only existence check, returns the final status
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError>;

    /// Streamed GET
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_body_chunks() {
        let mut body = MemoryBody::new(vec![7u8; 10_000]);
        let mut total = 0;
        let mut chunks = 0;

        while let Some(chunk) = body.chunk().await.unwrap() {
            total += chunk.len();
            chunks += 1;
        }

        assert_eq!(total, 10_000);
        assert_eq!(chunks, 3);
    }
}
