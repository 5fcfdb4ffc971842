//! Text normalizers: raw page text to typed field values
//!
//! Every function here returns `None` for text that does not yield a valid
//! value, so callers can fall through to their next candidate.

use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

/// Earliest publication year accepted
pub const MIN_YEAR: i32 = 1900;

/// Digits, a comma or period, then exactly two digits
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+[.,][0-9]{2}").expect("valid price regex"));

/// Optional ISBN-13 label followed by a 13–17 character run of digits and hyphens
static ISBN13_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ISBN[-\s]?13?[:\s]?)?([0-9-]{13,17})").expect("valid isbn-13 regex")
});

/// Optional ISBN-10 label followed by a 10–13 character run of digits and hyphens
static ISBN10_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ISBN[-\s]?10?[:\s]?)?([0-9-]{10,13})").expect("valid isbn-10 regex")
});

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19[0-9]{2}|20[0-9]{2})\b").expect("valid year regex"));

/// Parses the first price-shaped token in `text`
///
/// A comma is read as the decimal separator ("29,90" is 29.90). Only strictly
/// positive values are returned.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let token = PRICE_RE.find(text)?;
    let cleaned = token.as_str().replace(',', ".");

    match Decimal::from_str(&cleaned) {
        Ok(price) if price > Decimal::ZERO => Some(price),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to convert price {:?}: {}", text, e);
            None
        }
    }
}

/// Extracts an ISBN from free text
///
/// The first ISBN-13-shaped run is tried first and accepted only if it holds
/// exactly 13 digits; otherwise the first ISBN-10-shaped run is accepted only
/// if it holds exactly 10. Hyphens and any other non-digits are stripped.
pub fn extract_isbn(text: &str) -> Option<String> {
    if let Some(isbn) = first_run_with_digits(&ISBN13_RE, text, 13) {
        return Some(isbn);
    }
    first_run_with_digits(&ISBN10_RE, text, 10)
}

fn first_run_with_digits(pattern: &Regex, text: &str, digits: usize) -> Option<String> {
    let captures = pattern.captures(text)?;
    let isbn: String = captures[1].chars().filter(char::is_ascii_digit).collect();
    (isbn.len() == digits).then_some(isbn)
}

/// Returns true for a digit-only string of length 10 or 13
pub fn is_valid_isbn(value: &str) -> bool {
    (value.len() == 10 || value.len() == 13) && value.chars().all(|c| c.is_ascii_digit())
}

/// Returns the first 19xx/20xx token in `text` within `[MIN_YEAR, max_year]`
///
/// Out-of-range tokens are skipped, not clamped.
pub fn extract_year(text: &str, max_year: i32) -> Option<i32> {
    YEAR_RE
        .captures_iter(text)
        .filter_map(|captures| captures[1].parse::<i32>().ok())
        .find(|year| (MIN_YEAR..=max_year).contains(year))
}

/// Generates a random 13-digit identifier
///
/// Used when a page carries no ISBN at all. The result is a placeholder, not
/// a real ISBN, and is different on every call.
pub fn generate_isbn() -> String {
    let mut rng = rand::rng();
    (0..13)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
