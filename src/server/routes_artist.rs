//! Artist image lookup routes.
//!
//! `/artist-image` answers with JSON describing the resolved image,
//! `/artist-image/serve` redirects straight to it.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppContext;
use crate::resolver::ResolveError;

pub fn artist_routes() -> Router<AppContext> {
    Router::new()
        .route("/artist-image", get(get_artist_image))
        .route("/artist-image/serve", get(serve_artist_image))
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ArtistQuery {
    #[serde(default)]
    pub name: Option<String>,
}

impl ArtistQuery {
    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ArtistImageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtistImageResponse {
    fn failure(error: impl Into<String>, artist_name: Option<String>) -> Self {
        Self {
            success: false,
            image_url: None,
            source: None,
            cached_at: None,
            artist_name,
            error: Some(error.into()),
        }
    }
}

/// Status code a failed resolution is answered with.
fn status_for(error: &ResolveError) -> StatusCode {
    match error {
        ResolveError::InvalidInput => StatusCode::BAD_REQUEST,
        ResolveError::SourceUnavailable { .. } => StatusCode::NOT_FOUND,
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_artist_image(
    State(ctx): State<AppContext>,
    Query(query): Query<ArtistQuery>,
) -> Response {
    let Some(name) = query.name() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ArtistImageResponse::failure(ResolveError::InvalidInput.to_string(), None)),
        )
            .into_response();
    };

    match ctx.resolver.resolve(name).await {
        Ok(record) => Json(ArtistImageResponse {
            success: true,
            image_url: Some(record.url),
            source: Some(record.source),
            cached_at: Some(record.fetched_at),
            artist_name: Some(record.artist_name),
            error: None,
        })
        .into_response(),
        Err(e) => {
            let artist_name = match e {
                ResolveError::InvalidInput => None,
                ResolveError::SourceUnavailable { .. } => Some(name.to_string()),
            };
            (
                status_for(&e),
                Json(ArtistImageResponse::failure(e.to_string(), artist_name)),
            )
                .into_response()
        }
    }
}

async fn serve_artist_image(
    State(ctx): State<AppContext>,
    Query(query): Query<ArtistQuery>,
) -> Response {
    let Some(name) = query.name() else {
        return (
            StatusCode::BAD_REQUEST,
            ResolveError::InvalidInput.to_string(),
        )
            .into_response();
    };

    let record = match ctx.resolver.resolve(name).await {
        Ok(record) => record,
        Err(e) => return (status_for(&e), e.to_string()).into_response(),
    };

    match HeaderValue::try_from(record.url.as_str()) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::warn!(artist = name, url = %record.url, "Resolved URL is not a valid redirect target");
            (
                StatusCode::NOT_FOUND,
                "resolved image URL cannot be used as a redirect",
            )
                .into_response()
        }
    }
}
