//! End-to-end resolver tests against fake upstream sites.

mod common;

use std::sync::Arc;
use std::time::Duration;

use artistpic::blob::{ImageDownloader, MemoryBlobStore};
use artistpic::cache::{CacheStore, SqliteCacheStore};
use artistpic::resolver::{ImageResolver, ResolveError, ResolverConfig, ResolverContext};
use artistpic::source::DeezerSource;
use artistpic_db::pool::init_memory_pool;
use assert_matches::assert_matches;
use common::TestHarness;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn upload_failure_caches_source_url() {
    let harness = TestHarness::new().await;
    harness.mount_artist("Portishead", "portishead.png").await;
    harness.blobs.set_failing(true);

    let record = harness.resolver.resolve("Portishead").await.unwrap();
    assert_eq!(record.image_key, "");
    assert_eq!(record.url, harness.upstream_url("portishead.png"));

    let cached = harness.cache.lookup("portishead").await.unwrap().unwrap();
    assert_eq!(cached, record);

    // Once storage recovers, the degraded record is still fresh and reused.
    harness.blobs.set_failing(false);
    let again = harness.resolver.resolve("Portishead").await.unwrap();
    assert_eq!(again, record);
    assert!(harness.blobs.keys().is_empty());
}

#[tokio::test]
async fn placeholder_page_is_source_unavailable() {
    let harness = TestHarness::new().await;
    let html = r#"<html><head>
        <meta property="og:image" content="https://lastfm.freetls.fastly.net/i/u/ar0/2a96cbd8b46e442fc41c2b86b821562f.png">
        </head></html>"#;
    Mock::given(method("GET"))
        .and(path("/music/Unknown+Band"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&harness.upstream)
        .await;

    let err = harness.resolver.resolve("Unknown Band").await.unwrap_err();
    assert_matches!(err, ResolveError::SourceUnavailable { .. });
    assert!(err.to_string().contains("placeholder"));
    assert_eq!(harness.cache.count().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_requests_scrape_once() {
    let harness = TestHarness::new().await;
    harness.mount_artist("Massive+Attack", "massive.png").await;

    let mut handles = Vec::new();
    for name in ["Massive Attack", "massive attack", "MASSIVE ATTACK "] {
        let resolver = harness.resolver.clone();
        handles.push(tokio::spawn(async move { resolver.resolve(name).await }));
    }

    let mut urls = Vec::new();
    for handle in handles {
        urls.push(handle.await.unwrap().unwrap().url);
    }
    urls.dedup();
    assert_eq!(urls.len(), 1);
    assert_eq!(harness.cache.count().await.unwrap(), 1);
    assert_eq!(harness.upstream_hits("/music/").await, 1);
}

#[tokio::test]
async fn deezer_source_end_to_end() {
    let upstream = MockServer::start().await;
    let picture = format!("{}/images/artist/abc123/1000x1000.jpg", upstream.uri());
    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .and(query_param("q", "Daft Punk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "name": "Daft Punk", "picture_xl": picture }],
            "total": 1
        })))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/artist/abc123/1000x1000.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"jpeg".to_vec(), "image/jpeg"))
        .mount(&upstream)
        .await;

    let cache = SqliteCacheStore::new(init_memory_pool().unwrap());
    let blobs = Arc::new(MemoryBlobStore::new("artist-images", "cdn.test"));
    let resolver = ImageResolver::new(
        ResolverContext {
            cache: Arc::new(cache.clone()),
            source: Arc::new(DeezerSource::new(upstream.uri(), Duration::from_secs(2)).unwrap()),
            blobs: blobs.clone(),
            downloader: ImageDownloader::new(Duration::from_secs(2)).unwrap(),
        },
        ResolverConfig::default(),
    );

    let record = resolver.resolve("Daft Punk").await.unwrap();
    assert_eq!(record.source, "deezer");
    assert!(record.image_key.starts_with("Daft Punk_"));
    assert!(record.image_key.ends_with(".jpg"));
    assert_eq!(blobs.get(&record.image_key).unwrap().data.as_ref(), b"jpeg");
    assert_eq!(cache.lookup("daft punk").await.unwrap(), Some(record));
}
