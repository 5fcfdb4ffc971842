//! SQLite catalog implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore trait
//! plus the plain record management around it.

use crate::catalog::schema::initialize_schema;
use crate::catalog::traits::{CatalogStore, StorageError, StorageResult};
use crate::catalog::{
    Author, BookRecord, BookUpdate, Category, NewAuthor, NewCategory, ReferenceKind,
};
use crate::scrape::{is_valid_isbn, DraftBook, IsbnOrigin};
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

const MAX_TITLE_LEN: usize = 200;
const MAX_NAME_LEN: usize = 200;
const MAX_CATEGORY_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_SOURCE_URL_LEN: usize = 500;

const BOOK_COLUMNS: &str = "id, title, isbn, isbn_origin, publication_year, price, author_id,
     category_id, source_url, created_at, updated_at";

/// SQLite catalog backend
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Opens or creates the catalog database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Authors =====

    /// Creates an author; emails are unique
    pub fn create_author(&mut self, author: &NewAuthor) -> StorageResult<Author> {
        let name = author.name.trim();
        validate_required("name", name, MAX_NAME_LEN)?;
        validate_email(&author.email)?;

        if self.email_owner(&author.email)?.is_some() {
            return Err(email_taken(&author.email));
        }

        self.conn.execute(
            "INSERT INTO authors (name, email, birth_date) VALUES (?1, ?2, ?3)",
            params![name, author.email, author.birth_date.to_string()],
        )?;

        Ok(Author {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            email: author.email.clone(),
            birth_date: author.birth_date,
        })
    }

    pub fn list_authors(&self) -> StorageResult<Vec<Author>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, birth_date FROM authors ORDER BY id")?;
        let authors = stmt
            .query_map([], author_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(authors)
    }

    pub fn get_author(&self, id: i64) -> StorageResult<Author> {
        self.find_author(id)?
            .ok_or_else(|| StorageError::NotFound(format!("Autor não encontrado com ID: {}", id)))
    }

    /// Replaces an author's fields; the email stays unique among other authors
    pub fn update_author(&mut self, id: i64, author: &NewAuthor) -> StorageResult<Author> {
        self.get_author(id)?;

        let name = author.name.trim();
        validate_required("name", name, MAX_NAME_LEN)?;
        validate_email(&author.email)?;

        if matches!(self.email_owner(&author.email)?, Some(owner) if owner != id) {
            return Err(email_taken(&author.email));
        }

        self.conn.execute(
            "UPDATE authors SET name = ?1, email = ?2, birth_date = ?3 WHERE id = ?4",
            params![name, author.email, author.birth_date.to_string(), id],
        )?;

        Ok(Author {
            id,
            name: name.to_string(),
            email: author.email.clone(),
            birth_date: author.birth_date,
        })
    }

    /// Deletes an author that has no books
    pub fn delete_author(&mut self, id: i64) -> StorageResult<()> {
        self.get_author(id)?;
        if self.count_where("author_id", id)? > 0 {
            return Err(StorageError::ConstraintViolation(
                "Não é possível deletar autor que possui livros cadastrados".to_string(),
            ));
        }
        self.conn
            .execute("DELETE FROM authors WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ===== Categories =====

    pub fn create_category(&mut self, category: &NewCategory) -> StorageResult<Category> {
        let name = category.name.trim();
        validate_required("name", name, MAX_CATEGORY_NAME_LEN)?;
        if let Some(description) = &category.description {
            validate_max_len("description", description, MAX_DESCRIPTION_LEN)?;
        }

        self.conn.execute(
            "INSERT INTO categories (name, description) VALUES (?1, ?2)",
            params![name, category.description],
        )?;

        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            description: category.description.clone(),
        })
    }

    pub fn list_categories(&self) -> StorageResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM categories ORDER BY id")?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn get_category(&self, id: i64) -> StorageResult<Category> {
        self.find_category(id)?.ok_or_else(|| {
            StorageError::NotFound(format!("Categoria não encontrada com ID: {}", id))
        })
    }

    pub fn update_category(&mut self, id: i64, category: &NewCategory) -> StorageResult<Category> {
        self.get_category(id)?;

        let name = category.name.trim();
        validate_required("name", name, MAX_CATEGORY_NAME_LEN)?;
        if let Some(description) = &category.description {
            validate_max_len("description", description, MAX_DESCRIPTION_LEN)?;
        }

        self.conn.execute(
            "UPDATE categories SET name = ?1, description = ?2 WHERE id = ?3",
            params![name, category.description, id],
        )?;

        Ok(Category {
            id,
            name: name.to_string(),
            description: category.description.clone(),
        })
    }

    /// Deletes a category that has no books
    pub fn delete_category(&mut self, id: i64) -> StorageResult<()> {
        self.get_category(id)?;
        if self.count_where("category_id", id)? > 0 {
            return Err(StorageError::ConstraintViolation(
                "Não é possível deletar categoria que possui livros cadastrados".to_string(),
            ));
        }
        self.conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ===== Books =====

    pub fn get_book(&self, id: i64) -> StorageResult<BookRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
                params![id],
                book_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("Livro não encontrado com ID: {}", id)))
    }

    pub fn find_book_by_isbn(&self, isbn: &str) -> StorageResult<Option<BookRecord>> {
        let book = self
            .conn
            .query_row(
                &format!("SELECT {} FROM books WHERE isbn = ?1", BOOK_COLUMNS),
                params![isbn],
                book_from_row,
            )
            .optional()?;
        Ok(book)
    }

    pub fn list_books(&self) -> StorageResult<Vec<BookRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM books ORDER BY id", BOOK_COLUMNS))?;
        let books = stmt
            .query_map([], book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    /// Replaces a book's fields
    ///
    /// The ISBN must stay unique among other books and both references must
    /// exist. The ISBN origin is kept when the ISBN is unchanged; a new ISBN
    /// counts as extracted.
    pub fn update_book(&mut self, id: i64, update: &BookUpdate) -> StorageResult<BookRecord> {
        let current = self.get_book(id)?;

        let title = update.title.trim();
        validate_book_fields(title, &update.isbn, update.price)?;
        if let Some(source_url) = &update.source_url {
            validate_max_len("source_url", source_url, MAX_SOURCE_URL_LEN)?;
        }

        let origin = if update.isbn == current.isbn {
            current.isbn_origin
        } else {
            IsbnOrigin::Extracted
        };

        let tx = self.conn.transaction()?;

        let owner: Option<i64> = tx
            .query_row(
                "SELECT id FROM books WHERE isbn = ?1",
                params![update.isbn],
                |row| row.get(0),
            )
            .optional()?;
        if matches!(owner, Some(owner) if owner != id) {
            return Err(StorageError::DuplicateIsbn(update.isbn.clone()));
        }

        check_references(&tx, update.author_id, update.category_id)?;

        tx.execute(
            "UPDATE books SET title = ?1, isbn = ?2, isbn_origin = ?3, publication_year = ?4,
             price = ?5, author_id = ?6, category_id = ?7, source_url = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                title,
                update.isbn,
                origin.to_db_string(),
                update.publication_year,
                update.price.round_dp(2).to_string(),
                update.author_id,
                update.category_id,
                update.source_url,
                Utc::now().to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| map_unique_violation(e, &update.isbn))?;
        tx.commit()?;

        self.get_book(id)
    }

    pub fn delete_book(&mut self, id: i64) -> StorageResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!(
                "Livro não encontrado com ID: {}",
                id
            )));
        }
        Ok(())
    }

    pub fn count_books(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn email_owner(&self, email: &str) -> StorageResult<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT id FROM authors WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    fn count_where(&self, column: &str, id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM books WHERE {} = ?1", column),
            params![id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl CatalogStore for SqliteCatalog {
    fn find_author(&self, id: i64) -> StorageResult<Option<Author>> {
        let author = self
            .conn
            .query_row(
                "SELECT id, name, email, birth_date FROM authors WHERE id = ?1",
                params![id],
                author_from_row,
            )
            .optional()?;
        Ok(author)
    }

    fn find_category(&self, id: i64) -> StorageResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, description FROM categories WHERE id = ?1",
                params![id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    fn exists_by_isbn(&self, isbn: &str) -> StorageResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ?1)",
            params![isbn],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn create_book(&mut self, draft: &DraftBook) -> StorageResult<BookRecord> {
        validate_draft(draft)?;

        let author_id = draft.author_id.ok_or_else(|| {
            StorageError::Validation("author_id is required".to_string())
        })?;
        let category_id = draft.category_id.ok_or_else(|| {
            StorageError::Validation("category_id is required".to_string())
        })?;

        // Uniqueness and references are checked in the same transaction as the insert
        let tx = self.conn.transaction()?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = ?1)",
            params![draft.isbn.as_str()],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StorageError::DuplicateIsbn(draft.isbn.to_string()));
        }

        check_references(&tx, author_id, category_id)?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO books (title, isbn, isbn_origin, publication_year, price, author_id,
             category_id, source_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                draft.title.trim(),
                draft.isbn.as_str(),
                draft.isbn.origin().to_db_string(),
                draft.publication_year,
                draft.price.round_dp(2).to_string(),
                author_id,
                category_id,
                draft.source_url,
                now,
            ],
        )
        .map_err(|e| map_unique_violation(e, draft.isbn.as_str()))?;

        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.get_book(id)
    }
}

/// Turns a UNIQUE(isbn) violation from a racing insert into `DuplicateIsbn`
fn map_unique_violation(error: rusqlite::Error, isbn: &str) -> StorageError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::DuplicateIsbn(isbn.to_string())
        }
        _ => StorageError::Sqlite(error),
    }
}

/// Fails with `InvalidReference` when the author or category is missing
fn check_references(conn: &Connection, author_id: i64, category_id: i64) -> StorageResult<()> {
    let author_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM authors WHERE id = ?1)",
        params![author_id],
        |row| row.get(0),
    )?;
    if !author_exists {
        return Err(StorageError::InvalidReference {
            kind: ReferenceKind::Author,
            id: author_id,
        });
    }

    let category_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
        params![category_id],
        |row| row.get(0),
    )?;
    if !category_exists {
        return Err(StorageError::InvalidReference {
            kind: ReferenceKind::Category,
            id: category_id,
        });
    }

    Ok(())
}

fn email_taken(email: &str) -> StorageError {
    StorageError::ConstraintViolation(format!("Já existe um autor com este email: {}", email))
}

fn validate_draft(draft: &DraftBook) -> StorageResult<()> {
    validate_book_fields(draft.title.trim(), draft.isbn.as_str(), draft.price)?;
    validate_max_len("source_url", &draft.source_url, MAX_SOURCE_URL_LEN)
}

fn validate_book_fields(title: &str, isbn: &str, price: Decimal) -> StorageResult<()> {
    validate_required("title", title, MAX_TITLE_LEN)?;

    if !is_valid_isbn(isbn) {
        return Err(StorageError::Validation(
            "ISBN deve ter exatamente 10 ou 13 dígitos numéricos".to_string(),
        ));
    }

    if price < Decimal::new(1, 2) {
        return Err(StorageError::Validation("Preço deve ser positivo".to_string()));
    }

    Ok(())
}

fn validate_required(field: &str, value: &str, max_len: usize) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::Validation(format!("{} cannot be empty", field)));
    }
    validate_max_len(field, value, max_len)
}

fn validate_max_len(field: &str, value: &str, max_len: usize) -> StorageResult<()> {
    if value.chars().count() > max_len {
        return Err(StorageError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> StorageResult<()> {
    let invalid = || StorageError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    let birth_date: String = row.get(3)?;
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        birth_date: NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<BookRecord> {
    let origin: String = row.get(3)?;
    let price: String = row.get(5)?;
    Ok(BookRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        isbn: row.get(2)?,
        isbn_origin: IsbnOrigin::from_db_string(&origin).unwrap_or(IsbnOrigin::Extracted),
        publication_year: row.get(4)?,
        price: Decimal::from_str(&price)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        author_id: row.get(6)?,
        category_id: row.get(7)?,
        source_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
