//! `reqwest`-backed transport for the remote file host.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::{ResponseBody, Transport, TransportError, TransportResponse};

/// HTTP transport with a realistic client identification header
pub struct HttpTransport {
    /// HTTP client
    client: reqwest::Client,

    /// Bound on connecting, on waiting for headers, and on each body stall
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the given user agent and request timeout.
    ///
    /// The timeout never caps a whole download: a body that keeps
    /// delivering chunks may take as long as it needs.
    pub fn new(user_agent: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(request_timeout)
            // The host's download confirmation is tied to a session cookie
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            request_timeout,
        })
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidUrl(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

struct ReqwestBody {
    response: reqwest::Response,
    idle_timeout: Duration,
}

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let chunk = tokio::time::timeout(self.idle_timeout, self.response.chunk())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(map_error)?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_error)?;

        Ok(response.status().as_u16())
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = tokio::time::timeout(self.request_timeout, self.client.get(url).send())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(map_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().to_string();

        Ok(TransportResponse {
            status,
            content_type,
            url: final_url,
            body: Box::new(ReqwestBody {
                response,
                idle_timeout: self.request_timeout,
            }),
        })
    }
}
