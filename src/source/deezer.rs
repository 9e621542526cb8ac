//! Deezer artist search.
//!
//! Queries the public search API (`/search/artist?q=<name>`) and takes the
//! largest picture of the best match: an exact case-insensitive name match if
//! there is one, otherwise the first result. Deezer answers artists without a
//! photo with an image URL whose hash segment is empty (`.../artist//...`);
//! that is treated as a placeholder.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{scraping_client, ImageSource, SourceError};
use crate::config::SourceConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.deezer.com";

const SITE: &str = "deezer";

const PLACEHOLDER_MARKER: &str = "/artist//";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<DeezerArtist>,
    error: Option<DeezerError>,
}

#[derive(Debug, Deserialize)]
struct DeezerArtist {
    name: String,
    picture_xl: Option<String>,
    picture_big: Option<String>,
    picture_medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

impl DeezerArtist {
    fn best_picture(&self) -> Option<&str> {
        [&self.picture_xl, &self.picture_big, &self.picture_medium]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}

/// Resolves artist images through Deezer's search API.
pub struct DeezerSource {
    client: reqwest::Client,
    base_url: String,
}

impl DeezerSource {
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
        Self::new(base_url, config.timeout()).context("failed to build Deezer HTTP client")
    }
}

#[async_trait]
impl ImageSource for DeezerSource {
    fn id(&self) -> &'static str {
        SITE
    }

    async fn resolve(&self, artist_name: &str) -> Result<String, SourceError> {
        let url = format!("{}/search/artist", self.base_url.trim_end_matches('/'));
        tracing::debug!(url = %url, artist = artist_name, "Searching Deezer");

        let resp = self
            .client
            .get(&url)
            .query(&[("q", artist_name), ("limit", "10")])
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                site: SITE,
                status: resp.status().as_u16(),
            });
        }

        let body: SearchResponse = resp.json().await.map_err(|e| SourceError::Parse {
            site: SITE,
            reason: e.to_string(),
        })?;

        pick_picture(body, artist_name)
    }
}

fn pick_picture(body: SearchResponse, artist_name: &str) -> Result<String, SourceError> {
    if let Some(err) = body.error {
        return Err(SourceError::Parse {
            site: SITE,
            reason: format!("{}: {}", err.kind, err.message),
        });
    }

    let artist = body
        .data
        .iter()
        .find(|a| a.name.trim().eq_ignore_ascii_case(artist_name.trim()))
        .or_else(|| body.data.first())
        .ok_or(SourceError::NotFound { site: SITE })?;

    let picture = artist
        .best_picture()
        .ok_or(SourceError::NotFound { site: SITE })?;

    if picture.contains(PLACEHOLDER_MARKER) {
        return Err(SourceError::Placeholder { site: SITE });
    }

    Ok(picture.to_string())
}
