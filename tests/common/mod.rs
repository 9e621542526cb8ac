//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires an [`ImageResolver`] to an in-memory
//! SQLite cache, an in-memory blob store and a Last.fm scraper pointed at a
//! wiremock server standing in for the real site. The [`with_server`]
//! constructor also starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use artistpic::blob::{ImageDownloader, MemoryBlobStore};
use artistpic::cache::SqliteCacheStore;
use artistpic::resolver::{ImageResolver, ResolverConfig, ResolverContext};
use artistpic::server::{create_router, AppContext};
use artistpic::source::LastFmSource;
use artistpic_db::pool::init_memory_pool;

pub const BUCKET: &str = "artist-images";
pub const PUBLIC_ENDPOINT: &str = "cdn.test";

/// Test harness wrapping a fully-constructed [`ImageResolver`].
pub struct TestHarness {
    pub resolver: Arc<ImageResolver>,
    pub cache: SqliteCacheStore,
    pub blobs: Arc<MemoryBlobStore>,
    /// Fake Last.fm, also serving the image files.
    pub upstream: MockServer,
}

impl TestHarness {
    /// Create a new harness with the default resolver policy.
    pub async fn new() -> Self {
        Self::with_config(ResolverConfig::default()).await
    }

    /// Create a new harness with a custom resolver policy.
    pub async fn with_config(config: ResolverConfig) -> Self {
        let upstream = MockServer::start().await;
        let cache = SqliteCacheStore::new(init_memory_pool().expect("failed to create in-memory pool"));
        let blobs = Arc::new(MemoryBlobStore::new(BUCKET, PUBLIC_ENDPOINT));
        let source = LastFmSource::new(upstream.uri(), Duration::from_secs(2))
            .expect("failed to build Last.fm source");

        let ctx = ResolverContext {
            cache: Arc::new(cache.clone()),
            source: Arc::new(source),
            blobs: blobs.clone(),
            downloader: ImageDownloader::new(Duration::from_secs(2))
                .expect("failed to build downloader"),
        };

        Self {
            resolver: Arc::new(ImageResolver::new(ctx, config)),
            cache,
            blobs,
            upstream,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new().await;
        let app = create_router(AppContext::new(harness.resolver.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// URL of a file served by the fake upstream.
    pub fn upstream_url(&self, file: &str) -> String {
        format!("{}/images/{}", self.upstream.uri(), file)
    }

    /// Serve an artist page at `/music/{page}` whose header image is
    /// `/images/{file}`, and serve that image as PNG.
    pub async fn mount_artist(&self, page: &str, file: &str) {
        let html = format!(
            r#"<html><body><img class="header-new-background-image" src="{}"></body></html>"#,
            self.upstream_url(file)
        );
        Mock::given(method("GET"))
            .and(path(format!("/music/{page}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&self.upstream)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/images/{file}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"\x89PNG\r\n".to_vec(), "image/png"),
            )
            .mount(&self.upstream)
            .await;
    }

    /// Number of requests the fake upstream received for `path_prefix`.
    pub async fn upstream_hits(&self, path_prefix: &str) -> usize {
        self.upstream
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().starts_with(path_prefix))
            .count()
    }
}

/// HTTP client that does not follow redirects.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build client")
}
