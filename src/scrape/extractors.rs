//! Field extractors
//!
//! Each extractor maps a parsed page to one field value and never fails:
//! locators are tried most-specific first, then (for ISBN and year) the
//! whole page text, then a fixed default.

use crate::scrape::document::{document_text, first_accepted, Locator};
use crate::scrape::normalize::{extract_isbn, extract_year, generate_isbn, parse_price};
use crate::scrape::{Isbn, IsbnOrigin};
use rust_decimal::Decimal;
use scraper::Html;

/// Title returned when no title locator matches
pub const TITLE_NOT_FOUND: &str = "Título não encontrado";

/// Publication year returned when no year is found anywhere on the page
pub const DEFAULT_YEAR: i32 = 2023;

const TITLE_LOCATORS: &[Locator] = &[
    Locator::Css("#productTitle"),
    Locator::Css("span#productTitle"),
    Locator::Css("h1 span#productTitle"),
    Locator::Css(".product-title"),
    Locator::Css("h1.a-size-large"),
];

const PRICE_LOCATORS: &[Locator] = &[
    Locator::Css(".a-price-whole"),
    Locator::Css(".a-price .a-offscreen"),
    Locator::Css(".a-price-current .a-price-whole"),
    Locator::Css(".a-price-current"),
    Locator::Css(".a-price-range .a-price .a-offscreen"),
];

const ISBN_LOCATORS: &[Locator] = &[
    Locator::Css("#rpi-attribute-book_details-isbn13 .rpi-attribute-value span"),
    Locator::LabeledSibling {
        labels: "#detailBullets_feature_div span",
        label: "ISBN-13",
        value_tag: "span",
    },
    Locator::LabeledSibling {
        labels: "#detail-bullets span",
        label: "ISBN",
        value_tag: "span",
    },
    Locator::Containing {
        selector: ".content ul li",
        label: "ISBN",
    },
    Locator::Containing {
        selector: "#bookDetails_container_div div",
        label: "ISBN",
    },
];

const YEAR_LOCATORS: &[Locator] = &[
    Locator::Css("#rpi-attribute-book_details-publication_date .rpi-attribute-value span"),
    Locator::LabeledSibling {
        labels: "#detailBullets_feature_div span",
        label: "Data de publicação",
        value_tag: "span",
    },
    Locator::LabeledSibling {
        labels: "#detail-bullets span",
        label: "Publicação",
        value_tag: "span",
    },
];

/// Price returned when no price locator yields a positive value (29.90)
pub fn default_price() -> Decimal {
    Decimal::new(2990, 2)
}

/// Extracts the product title
pub fn extract_title(document: &Html) -> String {
    first_accepted(document, TITLE_LOCATORS, |text| Some(text.to_string()))
        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string())
}

/// Extracts a strictly positive price
pub fn extract_price(document: &Html) -> Decimal {
    first_accepted(document, PRICE_LOCATORS, parse_price).unwrap_or_else(default_price)
}

/// Extracts the ISBN, generating a random placeholder when the page has none
pub fn extract_isbn_field(document: &Html) -> Isbn {
    let found = first_accepted(document, ISBN_LOCATORS, extract_isbn)
        .or_else(|| extract_isbn(&document_text(document)));

    match found {
        Some(value) => Isbn::new(value, IsbnOrigin::Extracted),
        None => Isbn::new(generate_isbn(), IsbnOrigin::Generated),
    }
}

/// Extracts the publication year, accepting only `[1900, max_year]`
pub fn extract_year_field(document: &Html, max_year: i32) -> i32 {
    first_accepted(document, YEAR_LOCATORS, |text| extract_year(text, max_year))
        .or_else(|| extract_year(&document_text(document), max_year))
        .unwrap_or(DEFAULT_YEAR)
}
