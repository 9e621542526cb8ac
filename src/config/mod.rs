mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config.
///
/// Environment overrides are applied on top and the result is validated.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    let mut config = match custom_path {
        Some(path) => load_config(path)?,
        None => find_default_config()?.unwrap_or_default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;

    Ok(config)
}

fn find_default_config() -> Result<Option<Config>> {
    let default_paths = [
        "./artistpic.toml",
        "~/.config/artistpic/config.toml",
        "/etc/artistpic/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path).map(Some);
        }
    }

    Ok(None)
}

/// Apply the service's environment variables on top of `config`.
///
/// `lookup` returns the value of a variable; empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(port) = var("PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("PORT is not a valid port: {port}"))?;
    }
    if let Some(path) = var("DB_PATH") {
        config.database.path = path.into();
    }
    if let Some(endpoint) = var("MINIO_ENDPOINT") {
        config.storage.endpoint = endpoint;
    }
    if let Some(key) = var("MINIO_ACCESS_KEY") {
        config.storage.access_key = key;
    }
    if let Some(secret) = var("MINIO_SECRET_KEY") {
        config.storage.secret_key = secret;
    }
    if let Some(bucket) = var("MINIO_BUCKET") {
        config.storage.bucket = bucket;
    }
    if let Some(use_ssl) = var("MINIO_USE_SSL") {
        config.storage.use_ssl = use_ssl == "true";
    }
    if let Some(public) = var("MINIO_PUBLIC_ENDPOINT") {
        config.storage.public_endpoint = Some(public);
    }
    if let Some(hours) = var("CACHE_TTL_HOURS") {
        config.cache.ttl_hours = hours
            .parse()
            .with_context(|| format!("CACHE_TTL_HOURS is not a number: {hours}"))?;
    }
    if let Some(source) = var("IMAGE_SOURCE") {
        config.source.provider = source.parse().map_err(anyhow::Error::msg)?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.cache.ttl_hours == 0 {
        anyhow::bail!("Cache TTL must be at least one hour");
    }

    if config.storage.bucket.trim().is_empty() {
        anyhow::bail!("Storage bucket cannot be empty");
    }

    if config.storage.max_image_bytes == 0 {
        anyhow::bail!("Maximum image size cannot be 0");
    }

    if config.storage.backend == StorageBackend::S3 {
        if config.storage.endpoint.trim().is_empty() {
            anyhow::bail!("Storage endpoint cannot be empty");
        }
        if config.storage.endpoint.contains("://") {
            anyhow::bail!(
                "Storage endpoint must not include a scheme (use storage.use_ssl): {}",
                config.storage.endpoint
            );
        }
        if config.storage.access_key.is_empty() || config.storage.secret_key.is_empty() {
            tracing::warn!("Storage credentials are empty; uploads will likely be rejected");
        }
    }

    Ok(())
}
