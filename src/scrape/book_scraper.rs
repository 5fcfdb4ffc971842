//! Extraction orchestrator
//!
//! Fetches a page once and runs the four field extractors over the same
//! parsed document.

use crate::config::Config;
use crate::scrape::extractors::{extract_isbn_field, extract_price, extract_title, extract_year_field};
use crate::scrape::fetcher::PageFetcher;
use crate::scrape::DraftBook;
use crate::ExtractionError;
use scraper::Html;

/// Scrapes book fields out of product pages
#[derive(Debug, Clone)]
pub struct BookScraper {
    fetcher: PageFetcher,
    max_year: i32,
}

impl BookScraper {
    /// Creates a scraper from the fetcher and extraction settings
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            fetcher: PageFetcher::new(config.fetcher.clone())?,
            max_year: config.extraction.max_year,
        })
    }

    /// Fetches `url` and extracts a draft book from it
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Fetch` if the page could not be retrieved.
    pub async fn extract_book(&self, url: &str) -> Result<DraftBook, ExtractionError> {
        tracing::info!("Scraping book page: {}", url);

        let page = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::error!("Failed to fetch {}: {}", url, e);
            e
        })?;

        Ok(self.extract_from_html(url, &page.body))
    }

    /// Extracts a draft book from already-retrieved markup
    ///
    /// Parsing is lenient: an empty or malformed body yields a draft made of
    /// the field defaults.
    pub fn extract_from_html(&self, url: &str, body: &str) -> DraftBook {
        let document = Html::parse_document(body);

        let title = extract_title(&document);
        let price = extract_price(&document);
        let isbn = extract_isbn_field(&document);
        let publication_year = extract_year_field(&document, self.max_year);

        tracing::info!(
            "Scraping finished - title: {}, price: {}, isbn: {}",
            title,
            price,
            isbn
        );
        if isbn.is_generated() {
            tracing::warn!("No ISBN found on {}; generated placeholder {}", url, isbn);
        }

        DraftBook {
            title,
            price,
            isbn,
            publication_year,
            source_url: url.to_string(),
            author_id: None,
            category_id: None,
        }
    }
}
