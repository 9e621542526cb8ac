use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "artistpic")]
#[command(author, version, about = "Artist image lookup service with a durable cache")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve one artist image and print the record as JSON
    Resolve {
        /// Artist name
        #[arg(required = true)]
        name: String,
    },

    /// Show the cached record for an artist without contacting any source
    Lookup {
        /// Artist name
        #[arg(required = true)]
        name: String,
    },

    /// Show cache statistics
    Stats {
        /// Also list this many most recently refreshed artists
        #[arg(long, default_value = "0")]
        recent: u32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
