//! Downloads upstream images before they are mirrored into the blob store.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;

use super::BlobError;
use crate::source::BROWSER_USER_AGENT;

/// Content type assumed when the upstream response does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Largest image body accepted unless configured otherwise (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Image bytes plus the content type the upstream declared.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub data: Bytes,
    pub content_type: String,
}

/// HTTP image downloader with a bounded per-request timeout and body size.
#[derive(Clone)]
pub struct ImageDownloader {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ImageDownloader {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetch `url`. Any non-success status is an error, as is a body over
    /// the size limit, whether declared up front or found while reading.
    pub async fn fetch(&self, url: &str) -> Result<DownloadedImage, BlobError> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(BlobError::Download)?;

        if !resp.status().is_success() {
            return Err(BlobError::DownloadStatus(resp.status().as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        if resp.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(BlobError::TooLarge { limit: self.max_bytes });
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.map_err(BlobError::Download)? {
            if (data.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(BlobError::TooLarge { limit: self.max_bytes });
            }
            data.extend_from_slice(&chunk);
        }

        Ok(DownloadedImage {
            data: data.freeze(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_keeps_declared_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"\x89PNG fake".to_vec(), "image/png"),
            )
            .mount(&server)
            .await;

        let downloader = ImageDownloader::new(Duration::from_secs(5)).unwrap();
        let image = downloader
            .fetch(&format!("{}/a.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(&image.data[..], b"\x89PNG fake");
    }

    #[tokio::test]
    async fn test_fetch_defaults_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let downloader = ImageDownloader::new(Duration::from_secs(5)).unwrap();
        let image = downloader.fetch(&server.uri()).await.unwrap();
        assert_eq!(image.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let downloader = ImageDownloader::new(Duration::from_secs(5)).unwrap();
        assert_matches!(
            downloader.fetch(&server.uri()).await,
            Err(BlobError::DownloadStatus(403))
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 2048], "image/jpeg"))
            .mount(&server)
            .await;

        let downloader = ImageDownloader::new(Duration::from_secs(5))
            .unwrap()
            .with_max_bytes(1024);
        assert_matches!(
            downloader.fetch(&server.uri()).await,
            Err(BlobError::TooLarge { limit: 1024 })
        );

        let downloader = ImageDownloader::new(Duration::from_secs(5))
            .unwrap()
            .with_max_bytes(2048);
        let image = downloader.fetch(&server.uri()).await.unwrap();
        assert_eq!(image.data.len(), 2048);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let downloader = ImageDownloader::new(Duration::from_millis(500)).unwrap();
        assert_matches!(
            downloader.fetch("http://127.0.0.1:1/img.jpg").await,
            Err(BlobError::Download(_))
        );
    }
}
