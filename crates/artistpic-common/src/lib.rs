//! Artistpic-Common: Shared types and utilities.
//!
//! This crate provides the pieces every other artistpic crate agrees on:
//!
//! - **Record model**: [`CachedImageRecord`], the persisted unit of the cache
//! - **Key normalization**: [`normalize_key`], the single function that maps
//!   an artist name onto its cache identity
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use artistpic_common::{normalize_key, CachedImageRecord};
//!
//! assert_eq!(normalize_key("  Radiohead "), "radiohead");
//!
//! let record = CachedImageRecord::new(
//!     "Radiohead",
//!     "",
//!     "https://img.example/radiohead.jpg",
//!     "last.fm",
//!     chrono::Utc::now(),
//! );
//! assert!(!record.is_durable());
//! ```

pub mod error;
pub mod record;

pub use error::{Error, Result};
pub use record::{from_unix_seconds, normalize_key, CachedImageRecord};
