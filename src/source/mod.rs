//! Image sources: resolve an artist name to a direct image URL.
//!
//! Every upstream site is an implementation of the [`ImageSource`] trait. The
//! resolver is handed exactly one, chosen from configuration by
//! [`build_source`]. Each variant owns its own parsing and failure modes but
//! reports them all as a [`SourceError`].

pub mod deezer;
pub mod lastfm;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::{SourceConfig, SourceProvider};

pub use deezer::DeezerSource;
pub use lastfm::LastFmSource;

/// Browser user agent sent to upstream sites that reject obvious bots.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Why an image source could not produce a URL.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport failure, including timeouts.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream site answered with a non-success status.
    #[error("failed to fetch {site} page: status {status}")]
    Status { site: &'static str, status: u16 },

    /// The upstream response could not be understood.
    #[error("failed to parse {site} response: {reason}")]
    Parse { site: &'static str, reason: String },

    /// The page was fetched but carried no image.
    #[error("no image found on {site} page")]
    NotFound { site: &'static str },

    /// The only image available is the site's generic placeholder.
    #[error("only placeholder image available on {site}")]
    Placeholder { site: &'static str },
}

/// Capability that maps an artist name onto a candidate image URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Identifier stored in cache records (e.g. `"last.fm"`).
    fn id(&self) -> &'static str;

    /// Resolve `artist_name` to a direct image URL.
    async fn resolve(&self, artist_name: &str) -> Result<String, SourceError>;
}

/// Build the image source selected by configuration.
pub fn build_source(config: &SourceConfig) -> anyhow::Result<Arc<dyn ImageSource>> {
    let source: Arc<dyn ImageSource> = match config.provider {
        SourceProvider::LastFm => Arc::new(LastFmSource::from_config(config)?),
        SourceProvider::Deezer => Arc::new(DeezerSource::from_config(config)?),
    };
    tracing::info!(source = source.id(), "Image source configured");
    Ok(source)
}

/// HTTP client shared by the scraping sources.
///
/// Every request carries a bounded timeout and browser-like headers.
pub(crate) fn scraping_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .build()
}
