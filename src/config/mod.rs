//! Configuration model for keylock.
//!
//! This module defines the Config struct that represents `<store>/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! defaults for every field, and validation of config values.

mod model;
mod operations;
mod types;


// Re-export public API
pub use model::Config;
