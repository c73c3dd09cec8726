//! Configuration for tilecache hosts
//!
//! Provides types and loading for `tilecache.toml`.

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::*;
