//! Artistpic-DB: Cache schema, migrations, and query operations
//!
//! This crate provides durable storage for cached artist image records using
//! SQLite with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use artistpic_db::pool::{init_pool, get_conn};
//! use artistpic_db::queries::artist_images;
//!
//! let pool = init_pool("/var/lib/artistpic/cache.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let cached = artist_images::get_by_name(&conn, "Radiohead").unwrap();
//! println!("Cached: {:?}", cached.map(|r| r.url));
//! ```

pub mod migrations;
pub mod pool;
pub mod queries;
