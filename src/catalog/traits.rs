//! Storage traits and error types
//!
//! This module defines the contract the importer needs from a catalog
//! backend and the associated error types.

use crate::catalog::{Author, BookRecord, Category, ReferenceKind};
use crate::scrape::DraftBook;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Já existe um livro com este ISBN: {0}")]
    DuplicateIsbn(String),

    #[error("{kind} {} com ID: {id}", .kind.not_found_word())]
    InvalidReference { kind: ReferenceKind, id: i64 },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What the import pipeline needs from a catalog backend
///
/// `create_book` must re-check ISBN uniqueness and both references itself,
/// atomically with the insert, so that two concurrent imports of the same
/// ISBN cannot both succeed.
pub trait CatalogStore {
    /// Looks up an author by ID
    fn find_author(&self, id: i64) -> StorageResult<Option<Author>>;

    /// Looks up a category by ID
    fn find_category(&self, id: i64) -> StorageResult<Option<Category>>;

    /// Returns true if a book with this ISBN is already cataloged
    fn exists_by_isbn(&self, isbn: &str) -> StorageResult<bool>;

    /// Persists a draft book
    ///
    /// # Errors
    ///
    /// * `StorageError::DuplicateIsbn` - The ISBN is already cataloged
    /// * `StorageError::InvalidReference` - The author or category does not exist
    /// * `StorageError::Validation` - The draft violates a record constraint
    fn create_book(&mut self, draft: &DraftBook) -> StorageResult<BookRecord>;
}
