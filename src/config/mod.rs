//! Configuration module for Biblioteca
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! # Example
//!
//! ```no_run
//! use biblioteca::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("biblioteca.toml")).unwrap();
//! println!("Fetch timeout: {}ms", config.fetcher.timeout_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractionConfig, FetcherConfig, StorageConfig, DEFAULT_MAX_YEAR, DEFAULT_TIMEOUT_MS,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
