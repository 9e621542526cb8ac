//! Last.fm artist page scraper.
//!
//! Fetches `https://www.last.fm/music/<artist>` and pulls the artist image out
//! of the HTML. Selectors are tried in order:
//!
//! 1. the header background image (first match),
//! 2. the artist avatar (last match),
//! 3. the `og:image` meta tag (last match).
//!
//! Last.fm serves a generic star image for artists without a photo; those are
//! rejected as [`SourceError::Placeholder`].

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{Html, Selector};

use super::{scraping_client, ImageSource, SourceError};
use crate::config::SourceConfig;

pub const DEFAULT_BASE_URL: &str = "https://www.last.fm";

const SITE: &str = "last.fm";

/// Image hashes of Last.fm's "no artist image" placeholders.
const PLACEHOLDER_HASHES: [&str; 2] = [
    "2a96cbd8b46e442fc41c2b86b821562f",
    "c6f59c1e5e7240a4c0d427abd71f3dbb",
];

/// Scrapes artist images from Last.fm artist pages.
pub struct LastFmSource {
    client: reqwest::Client,
    base_url: String,
}

impl LastFmSource {
    /// Create a scraper against `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: scraping_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, config.timeout()).context("failed to build Last.fm HTTP client")
    }

    fn artist_page_url(&self, artist_name: &str) -> String {
        format!(
            "{}/music/{}",
            self.base_url.trim_end_matches('/'),
            encode_artist_path(artist_name)
        )
    }
}

#[async_trait]
impl ImageSource for LastFmSource {
    fn id(&self) -> &'static str {
        SITE
    }

    async fn resolve(&self, artist_name: &str) -> Result<String, SourceError> {
        let url = self.artist_page_url(artist_name);
        tracing::debug!(url = %url, "Scraping Last.fm");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        if resp.status() != StatusCode::OK {
            return Err(SourceError::Status {
                site: SITE,
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|source| SourceError::Http { url, source })?;

        let image_url = extract_image_url(&body).ok_or(SourceError::NotFound { site: SITE })?;

        if is_placeholder(&image_url) {
            return Err(SourceError::Placeholder { site: SITE });
        }

        tracing::debug!(image_url = %image_url, "Found Last.fm image");
        Ok(image_url)
    }
}

/// Last.fm path segment for an artist: words joined by `+`, each
/// percent-encoded.
fn encode_artist_path(artist_name: &str) -> String {
    artist_name
        .split(' ')
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Pull the best artist image URL out of a Last.fm artist page.
fn extract_image_url(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let non_empty = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);

    let header = selector("img.header-new-background-image");
    if let Some(src) = doc.select(&header).find_map(|el| non_empty(el.value().attr("src"))) {
        return Some(src);
    }

    let avatar = selector("img.avatar");
    if let Some(src) = doc
        .select(&avatar)
        .filter_map(|el| non_empty(el.value().attr("src")))
        .last()
    {
        return Some(src);
    }

    let og_image = selector("meta[property='og:image']");
    doc.select(&og_image)
        .filter_map(|el| non_empty(el.value().attr("content")))
        .last()
}

fn is_placeholder(image_url: &str) -> bool {
    PLACEHOLDER_HASHES.iter().any(|hash| image_url.contains(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(body: &str) -> String {
        format!("<!doctype html><html><head></head><body>{body}</body></html>")
    }

    fn source(server: &MockServer) -> LastFmSource {
        LastFmSource::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_encode_artist_path() {
        assert_eq!(encode_artist_path("Radiohead"), "Radiohead");
        assert_eq!(encode_artist_path("The National"), "The+National");
        assert_eq!(encode_artist_path("AC/DC"), "AC%2FDC");
        assert_eq!(encode_artist_path("Sigur Rós"), "Sigur+R%C3%B3s");
    }

    #[test]
    fn test_header_image_wins_over_avatar() {
        let html = page(
            r#"<img class="avatar" src="https://img/avatar.jpg">
               <img class="header-new-background-image" src="https://img/header-1.jpg">
               <img class="header-new-background-image" src="https://img/header-2.jpg">"#,
        );
        assert_eq!(extract_image_url(&html).as_deref(), Some("https://img/header-1.jpg"));
    }

    #[test]
    fn test_last_avatar_is_used() {
        let html = page(
            r#"<img class="avatar" src="https://img/a1.jpg">
               <img class="avatar" src="https://img/a2.jpg">"#,
        );
        assert_eq!(extract_image_url(&html).as_deref(), Some("https://img/a2.jpg"));
    }

    #[test]
    fn test_og_image_fallback() {
        let html = r#"<html><head><meta property="og:image" content="https://img/og.png"></head><body></body></html>"#;
        assert_eq!(extract_image_url(html).as_deref(), Some("https://img/og.png"));
    }

    #[test]
    fn test_no_image() {
        assert_eq!(extract_image_url(&page("<p>nothing here</p>")), None);
        assert_eq!(extract_image_url(&page(r#"<img class="avatar" src="">"#)), None);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder(
            "https://lastfm.freetls.fastly.net/i/u/ar0/2a96cbd8b46e442fc41c2b86b821562f.png"
        ));
        assert!(!is_placeholder("https://lastfm.freetls.fastly.net/i/u/ar0/abc.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_scrapes_artist_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/music/The+National"))
            .and(header("referer", "https://www.google.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(
                r#"<img class="header-new-background-image" src="https://img/national.jpg">"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let url = source(&server).resolve("The National").await.unwrap();
        assert_eq!(url, "https://img/national.jpg");
    }

    #[tokio::test]
    async fn test_resolve_non_200_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = source(&server).resolve("Nobody").await.unwrap_err();
        assert_matches!(err, SourceError::Status { status: 404, .. });
    }

    #[tokio::test]
    async fn test_resolve_placeholder_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(
                r#"<img class="avatar" src="https://img/c6f59c1e5e7240a4c0d427abd71f3dbb.png">"#,
            )))
            .mount(&server)
            .await;

        let err = source(&server).resolve("Unknown Band").await.unwrap_err();
        assert_matches!(err, SourceError::Placeholder { .. });
    }

    #[tokio::test]
    async fn test_resolve_page_without_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("<h1>Artist</h1>")))
            .mount(&server)
            .await;

        let err = source(&server).resolve("Artist").await.unwrap_err();
        assert_matches!(err, SourceError::NotFound { .. });
    }

    #[tokio::test]
    async fn test_resolve_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page("<h1>slow</h1>"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let source = LastFmSource::new(server.uri(), Duration::from_millis(100)).unwrap();
        let err = source.resolve("Slow").await.unwrap_err();
        assert_matches!(err, SourceError::Http { .. });
    }
}
