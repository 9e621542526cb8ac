mod cli;

use artistpic::{bootstrap, cache::CacheStore, config, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over file and environment
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting artistpic server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let resolver = Arc::new(bootstrap::build_resolver(&config).await?);
    server::start_server(&config, resolver).await
}

async fn resolve_artist(name: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let resolver = bootstrap::build_resolver(&config).await?;

    let record = resolver.resolve(name).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn lookup_artist(name: &str, config_path: Option<&Path>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("artist name is required");
    }

    let config = config::load_config_or_default(config_path)?;
    let cache = bootstrap::open_cache(&config)?;

    match cache.lookup(name).await? {
        Some(record) => {
            let fresh = record.is_fresh(chrono::Utc::now(), config.cache.ttl());
            println!("{}", serde_json::to_string_pretty(&record)?);
            println!("Fresh: {}", fresh);
        }
        None => println!("No cached image for '{}'", name),
    }
    Ok(())
}

async fn show_stats(recent: u32, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let cache = bootstrap::open_cache(&config)?;
    // Builds the client only; stats never contact object storage
    let blobs = bootstrap::build_blob_store(&config.storage)?;

    println!("Cached artists: {}", cache.count().await?);
    println!("Bucket: {}", blobs.bucket());
    println!("Storage: {}", blobs.backend());
    println!("Database: {}", cache.backend());

    if recent > 0 {
        let records = cache.list_recent(recent).await?;
        println!("\nRecently refreshed:");
        for record in records {
            let stored = if record.is_durable() { "stored" } else { "source" };
            println!(
                "  {}  {}  [{}] {}",
                record.fetched_at.to_rfc3339(),
                record.artist_name,
                stored,
                record.url
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "artistpic=trace,artistpic_db=debug,artistpic_common=debug,tower_http=debug".to_string()
        } else {
            "artistpic=info,artistpic_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, config_path))
        }
        Commands::Resolve { name } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve_artist(&name, config_path))
        }
        Commands::Lookup { name } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(lookup_artist(&name, config_path))
        }
        Commands::Stats { recent } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_stats(recent, config_path))
        }
        Commands::Validate {
            config: validate_path,
        } => validate(validate_path.as_deref().or(config_path)),
        Commands::Version => {
            println!("artistpic {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, checking defaults and environment"),
    }

    let config = config::load_config_or_default(path)?;
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.path.display());
    println!(
        "  Storage: {:?} {} (bucket {})",
        config.storage.backend, config.storage.endpoint, config.storage.bucket
    );
    println!("  Public endpoint: {}", config.storage.public_endpoint());
    println!("  Image source: {:?}", config.source.provider);
    println!("  Cache TTL: {}h", config.cache.ttl_hours);

    Ok(())
}
