//! Catalog storage for books, authors and categories
//!
//! This module handles all database operations for the catalog, including:
//! - SQLite database initialization and schema management
//! - Author and category records
//! - Book creation with ISBN uniqueness and reference checks
//! - The narrow [`CatalogStore`] contract consumed by the importer

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCatalog;
pub use traits::{CatalogStore, StorageError, StorageResult};

use crate::scrape::IsbnOrigin;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opens (or creates) the catalog database at `path`
pub fn open_catalog(path: &Path) -> StorageResult<SqliteCatalog> {
    SqliteCatalog::new(path)
}

/// Kinds of entity a book refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Author,
    Category,
}

impl ReferenceKind {
    /// Grammatical "not found" for the entity name
    pub fn not_found_word(&self) -> &'static str {
        match self {
            Self::Author => "não encontrado",
            Self::Category => "não encontrada",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Author => f.write_str("Autor"),
            Self::Category => f.write_str("Categoria"),
        }
    }
}

/// An author in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub birth_date: NaiveDate,
}

/// Fields needed to create an author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthor {
    pub name: String,
    pub email: String,
    pub birth_date: NaiveDate,
}

/// A category in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Fields needed to create a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// A persisted book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub isbn_origin: IsbnOrigin,
    pub publication_year: i32,
    pub price: Decimal,
    pub author_id: i64,
    pub category_id: i64,
    pub source_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Replacement values for an existing book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub price: Decimal,
    pub author_id: i64,
    pub category_id: i64,
    pub source_url: Option<String>,
}

impl BookUpdate {
    /// Starts from the book's current values
    pub fn from_record(record: &BookRecord) -> Self {
        Self {
            title: record.title.clone(),
            isbn: record.isbn.clone(),
            publication_year: record.publication_year,
            price: record.price,
            author_id: record.author_id,
            category_id: record.category_id,
            source_url: record.source_url.clone(),
        }
    }
}
