//! HTTP fetcher for product pages
//!
//! This module handles the one network operation of an import:
//! - Building the HTTP client with the configured user agent and timeout
//! - Following (or refusing) redirects
//! - Classifying failures into [`FetchError`] variants
//!
//! Retries are layered on top in [`crate::scrape::retry`].

use crate::config::FetcherConfig;
use crate::scrape::retry::retry_with_delay;
use crate::FetchError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed when redirects are enabled
const MAX_REDIRECTS: usize = 10;

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Builds an HTTP client from the fetcher configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let redirect = if config.follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_millis(config.timeout_ms))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher bound to one HTTP client and its configuration
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    config: FetcherConfig,
}

impl PageFetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Fetches `url`, retrying transient failures up to `max-retries` times
    ///
    /// With the default configuration the request is attempted exactly once.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        retry_with_delay(self.config.max_retries, self.config.retry_delay_ms, || {
            fetch_url(&self.client, url, self.config.timeout_ms)
        })
        .await
    }
}

/// Performs a single GET request and classifies the result
///
/// | Condition | Result |
/// |-----------|--------|
/// | Unparsable or non-HTTP(S) URL | `FetchError::InvalidUrl` |
/// | Client timeout elapsed | `FetchError::Timeout` |
/// | Connection refused / DNS / TLS | `FetchError::Connect` |
/// | Non-2xx status (including unfollowed 3xx) | `FetchError::Status` |
/// | Anything else | `FetchError::Request` |
pub async fn fetch_url(client: &Client, url: &str, timeout_ms: u64) -> Result<FetchedPage, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    tracing::debug!("GET {}", parsed);

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| classify_error(url, timeout_ms, e))?;

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify_error(url, timeout_ms, e))?;

    tracing::debug!("Fetched {} ({} bytes)", final_url, body.len());

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body,
    })
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, timeout_ms: u64, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms,
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: error,
        }
    }
}
