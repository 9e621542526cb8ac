//! The cached artist image record and its key normalization.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Map an artist name onto its cache identity.
///
/// Trims surrounding whitespace and lowercases the rest. Both the lookup and
/// the upsert path go through this function; any divergence would orphan
/// cache entries.
pub fn normalize_key(artist_name: &str) -> String {
    artist_name.trim().to_lowercase()
}

/// Metadata about one artist's cached image.
///
/// `image_key` is empty when the durable upload did not happen; `url` then
/// points straight at the upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedImageRecord {
    /// Artist name in display form, as supplied by the caller (trimmed).
    pub artist_name: String,
    /// Object key in the blob store, or empty in degraded mode.
    pub image_key: String,
    /// URL clients should use.
    pub url: String,
    /// Identifier of the image source that produced this record.
    pub source: String,
    /// When this record was created or last refreshed.
    pub fetched_at: DateTime<Utc>,
}

impl CachedImageRecord {
    /// Build a record, truncating `fetched_at` to whole seconds.
    ///
    /// The cache persists unix seconds, so truncating here keeps a written
    /// record and its read-back equal.
    pub fn new(
        artist_name: impl Into<String>,
        image_key: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            artist_name: artist_name.into(),
            image_key: image_key.into(),
            url: url.into(),
            source: source.into(),
            fetched_at: truncate_to_seconds(fetched_at),
        }
    }

    /// The cache identity of this record.
    pub fn normalized_key(&self) -> String {
        normalize_key(&self.artist_name)
    }

    /// Whether the image was copied into the blob store.
    pub fn is_durable(&self) -> bool {
        !self.image_key.is_empty()
    }

    /// Age of the record at `now`. Clock skew into the future counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// A record is fresh while its age is strictly below `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    /// `fetched_at` as unix seconds, the persisted form.
    pub fn fetched_at_unix(&self) -> i64 {
        self.fetched_at.timestamp()
    }
}

/// Convert persisted unix seconds back into a timestamp.
///
/// Out-of-range values collapse to the unix epoch, which reads as stale.
pub fn from_unix_seconds(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or_default()
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    from_unix_seconds(ts.timestamp())
}
