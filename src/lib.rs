//! Artistpic - artist image lookup service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod blob;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod resolver;
pub mod server;
pub mod source;
