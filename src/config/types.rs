use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the image cache
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./artist_images.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Any S3-compatible service (MinIO, AWS S3)
    #[default]
    S3,
    /// Process memory, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// API endpoint as `host[:port]`, without scheme
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Use https for both the API and public URLs
    #[serde(default)]
    pub use_ssl: bool,

    /// Host clients should fetch images from, when it differs from `endpoint`
    #[serde(default)]
    pub public_endpoint: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Upload request timeout
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,

    /// Timeout for downloading the upstream image
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Upstream images larger than this are not mirrored
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

fn default_endpoint() -> String {
    "localhost:9000".to_string()
}
fn default_bucket() -> String {
    "artist-images".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_storage_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    10
}
fn default_max_image_bytes() -> u64 {
    crate::blob::DEFAULT_MAX_IMAGE_BYTES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            endpoint: default_endpoint(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: default_bucket(),
            use_ssl: false,
            public_endpoint: None,
            region: default_region(),
            timeout_secs: default_storage_timeout(),
            download_timeout_secs: default_download_timeout(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl StorageConfig {
    /// Endpoint used in public URLs; falls back to the API endpoint.
    pub fn public_endpoint(&self) -> &str {
        self.public_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProvider {
    #[default]
    LastFm,
    Deezer,
}

impl std::str::FromStr for SourceProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lastfm" | "last.fm" => Ok(Self::LastFm),
            "deezer" => Ok(Self::Deezer),
            other => Err(format!("unknown image source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub provider: SourceProvider,

    /// Override the upstream base URL (used by tests and mirrors)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

fn default_source_timeout() -> u64 {
    10
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: SourceProvider::default(),
            base_url: None,
            timeout_secs: default_source_timeout(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Records older than this are refreshed on lookup
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Return a stale record when refreshing it fails
    #[serde(default)]
    pub serve_stale_on_error: bool,

    /// Let concurrent lookups of one artist share a single upstream fetch
    #[serde(default = "default_true")]
    pub coalesce_in_flight: bool,
}

fn default_ttl_hours() -> u64 {
    7 * 24
}
fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            serve_stale_on_error: false,
            coalesce_in_flight: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60))
    }
}
