use serde::Deserialize;

/// Default request timeout for page fetches (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default identification header sent with every page fetch
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Latest publication year accepted by the year extractor
pub const DEFAULT_MAX_YEAR: i32 = 2024;

/// Main configuration structure for Biblioteca
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub extraction: ExtractionConfig,
    pub storage: StorageConfig,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Request timeout (milliseconds)
    pub timeout_ms: u64,

    /// Value of the User-Agent header
    pub user_agent: String,

    /// Whether HTTP redirects are followed
    pub follow_redirects: bool,

    /// Additional attempts after a transient failure; 0 means a single attempt
    pub max_retries: u32,

    /// Pause between attempts (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

/// Field extraction tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// Upper bound for accepted publication years
    pub max_year: i32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_year: DEFAULT_MAX_YEAR,
        }
    }
}

/// Catalog storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./biblioteca.db".to_string(),
        }
    }
}
