//! Cache statistics.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppContext;

pub fn stats_routes() -> Router<AppContext> {
    Router::new().route("/stats", get(get_stats))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub cached_artists: u64,
    pub bucket: String,
    pub storage: &'static str,
    pub database: &'static str,
}

/// Report the number of cached artists and where they live.
///
/// A failing count is logged and reported as 0.
async fn get_stats(State(ctx): State<AppContext>) -> Json<StatsResponse> {
    let resolver = &ctx.resolver;
    let cached_artists = match resolver.cached_count().await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Error getting cache count: {}", e);
            0
        }
    };

    Json(StatsResponse {
        cached_artists,
        bucket: resolver.bucket().to_string(),
        storage: resolver.storage_backend(),
        database: resolver.database_backend(),
    })
}
