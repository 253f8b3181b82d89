//! HTTP probe: downloads the resource and verifies it decodes.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::domain::errors::LoadError;
use crate::domain::ports::ImageProbePort;

/// Probes a URL by fetching it and decoding the body as an image.
///
/// The client carries its own transport timeout as a backstop; the
/// load service additionally enforces the configured per-attempt
/// timeout around every probe call.
pub struct HttpImageProbe {
    client: reqwest::Client,
}

impl HttpImageProbe {
    /// Creates a probe with the given transport timeout.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::probe(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl std::fmt::Debug for HttpImageProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImageProbe").finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageProbePort for HttpImageProbe {
    async fn probe(&self, url: &str) -> Result<(), LoadError> {
        trace!(url = %url, "probing image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::probe(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LoadError::probe(format!("HTTP {}", response.status())));
        }

        let body: bytes::Bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::probe(format!("failed to read body: {e}")))?;

        tokio::task::spawn_blocking(move || image::load_from_memory(&body).map(|_| ()))
            .await
            .map_err(|e| LoadError::probe(format!("decode task panicked: {e}")))?
            .map_err(|e| LoadError::probe(format!("decode failed: {e}")))?;

        Ok(())
    }
}
