//! Biblioteca: a book catalog with page-scraping import
//!
//! This crate manages a small catalog of books, authors and categories and can
//! import a book by scraping title, price, ISBN and publication year out of a
//! product page.

pub mod catalog;
pub mod config;
pub mod import;
pub mod scrape;

use thiserror::Error;

/// Main error type for Biblioteca operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] catalog::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while retrieving a product page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request cancelled: {url}")]
    Cancelled { url: String },
}

impl FetchError {
    /// Transient failures worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::InvalidUrl { .. } | Self::Request { .. } | Self::Cancelled { .. } => false,
        }
    }
}

/// Errors raised by the extraction orchestrator
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Erro ao extrair dados da página: {0}")]
    Fetch(#[from] FetchError),
}

/// Result type alias for Biblioteca operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{CatalogStore, SqliteCatalog};
pub use config::Config;
pub use import::{ImportOutcome, ImportRequest, ImportStatus, Importer};
pub use scrape::{BookScraper, DraftBook, Isbn, IsbnOrigin};
