//! Database query operations.
//!
//! Each submodule owns the queries for one table.

pub mod artist_images;
