//! Best-effort liveness check for direct URLs.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::adapters::Transport;

/// Header-only accessibility prober.
///
/// A 200 means "reachable", not "valid content"; every failure mode
/// collapses to `false`.
pub struct Prober {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl Prober {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Check whether a URL answers with HTTP 200
    pub async fn probe(&self, url: &str) -> bool {
        match self.transport.head(url, self.timeout).await {
            Ok(status) => {
                debug!(url, status, "Probe finished");
                status == 200
            }
            Err(e) => {
                debug!(url, error = %e, "Probe failed");
                false
            }
        }
    }
}
