//! Scraping pipeline for product pages
//!
//! This module turns a URL into a [`DraftBook`]:
//! - Fetching the page once, with optional bounded retry
//! - Locating candidate text for each field in priority order
//! - Normalizing text into typed values with fixed defaults

mod book_scraper;
mod document;
mod extractors;
mod fetcher;
mod normalize;
mod retry;

pub use book_scraper::BookScraper;
pub use document::{document_text, element_text, first_accepted, Locator};
pub use extractors::{
    default_price, extract_isbn_field, extract_price, extract_title, extract_year_field,
    DEFAULT_YEAR, TITLE_NOT_FOUND,
};
pub use fetcher::{build_http_client, fetch_url, FetchedPage, PageFetcher};
pub use normalize::{extract_isbn, extract_year, generate_isbn, is_valid_isbn, parse_price, MIN_YEAR};
pub use retry::retry_with_delay;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// How an ISBN value came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsbnOrigin {
    /// Read from the page
    Extracted,
    /// Randomly generated because the page carried none
    Generated,
}

impl IsbnOrigin {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Generated => "generated",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "extracted" => Some(Self::Extracted),
            "generated" => Some(Self::Generated),
            _ => None,
        }
    }
}

/// A digit-only identifier of length 10 or 13, tagged with its origin
///
/// Deserialization accepts either a bare string (taken as extracted) or the
/// serialized `{value, origin}` form, and rejects anything `parse` would.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Isbn {
    value: String,
    origin: IsbnOrigin,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IsbnRepr {
    Plain(String),
    Tagged { value: String, origin: IsbnOrigin },
}

impl<'de> Deserialize<'de> for Isbn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (value, origin) = match IsbnRepr::deserialize(deserializer)? {
            IsbnRepr::Plain(value) => (value, IsbnOrigin::Extracted),
            IsbnRepr::Tagged { value, origin } => (value, origin),
        };
        if !is_valid_isbn(&value) {
            return Err(de::Error::custom(format!(
                "invalid ISBN '{}': expected 10 or 13 digits",
                value
            )));
        }
        Ok(Self::new(value, origin))
    }
}

impl Isbn {
    pub(crate) fn new(value: String, origin: IsbnOrigin) -> Self {
        Self { value, origin }
    }

    /// Builds an extracted ISBN from user-supplied text, if it is valid
    pub fn parse(value: &str) -> Option<Self> {
        is_valid_isbn(value).then(|| Self::new(value.to_string(), IsbnOrigin::Extracted))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn origin(&self) -> IsbnOrigin {
        self.origin
    }

    /// Generated identifiers are placeholders and should be reviewed
    pub fn is_generated(&self) -> bool {
        self.origin == IsbnOrigin::Generated
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A book extracted from a page but not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBook {
    pub title: String,
    pub price: Decimal,
    pub isbn: Isbn,
    pub publication_year: i32,
    pub source_url: String,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
}
