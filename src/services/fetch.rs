//! Remote image download

use crate::{
    error::{ImageGenError, Result},
    pixel::PixelBuffer,
    services::ImageIOService,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Download timeout used when none is configured
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of encoded image bytes addressed by URL
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch the encoded bytes behind `url`
    ///
    /// # Errors
    /// - Unreachable source or non-success response
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch and decode into a pixel buffer
    ///
    /// # Errors
    /// - Any fetch error
    /// - `Decode` / `InvalidBufferShape` for unusable content
    async fn fetch_buffer(&self, url: &str) -> Result<PixelBuffer> {
        let bytes = self.fetch(url).await?;
        ImageIOService::decode_to_buffer(&bytes)
    }
}

/// HTTP(S) image downloader
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    /// Create a fetcher with the default 30 second timeout
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageGenError::network_error("Failed to create HTTP client", e))?;
        Ok(Self { client })
    }

    /// Whether `source` looks like something this fetcher can download
    #[must_use]
    pub fn is_remote(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if !Self::is_remote(url) {
            return Err(ImageGenError::decode(format!(
                "Unsupported image URL '{}': only http and https are fetched",
                url
            )));
        }

        tracing::info!(url = %url, "Downloading image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageGenError::network_error(&format!("Failed to download {}", url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageGenError::Network(format!(
                "Failed to download {}: HTTP {}",
                url, status
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            ImageGenError::network_error(&format!("Failed to read body of {}", url), e)
        })?;

        tracing::debug!(url = %url, size_bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(HttpImageFetcher::is_remote("https://cdn.example.com/a.png"));
        assert!(HttpImageFetcher::is_remote("http://localhost:3001/a.png"));
        assert!(!HttpImageFetcher::is_remote("/tmp/a.png"));
        assert!(!HttpImageFetcher::is_remote("ftp://example.com/a.png"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_urls() {
        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, ImageGenError::Decode(_)));
    }
}
