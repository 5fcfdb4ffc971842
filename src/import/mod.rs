//! Import orchestration
//!
//! The [`Importer`] validates references, scrapes the page, checks for
//! duplicates and persists the result, reporting every failure as an
//! [`ImportOutcome`] instead of an error.

mod outcome;
mod stage;

pub use outcome::{ImportErrorKind, ImportOutcome, ImportRequest, ImportStatus};
pub use stage::ImportStage;

use crate::catalog::{CatalogStore, ReferenceKind, StorageError, StorageResult};
use crate::config::Config;
use crate::scrape::BookScraper;
use crate::{ExtractionError, FetchError};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const CANCELLED_MESSAGE: &str = "importação cancelada";

/// Imports books from product pages into a catalog store
///
/// Cloning is cheap: clones share the store and the HTTP client.
pub struct Importer<S> {
    store: Arc<Mutex<S>>,
    scraper: BookScraper,
}

impl<S> Clone for Importer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            scraper: self.scraper.clone(),
        }
    }
}

impl<S: CatalogStore> Importer<S> {
    pub fn new(store: Arc<Mutex<S>>, scraper: BookScraper) -> Self {
        Self { store, scraper }
    }

    /// Builds an importer whose scraper follows `config`
    pub fn from_config(store: Arc<Mutex<S>>, config: &Config) -> crate::Result<Self> {
        Ok(Self::new(store, BookScraper::new(config)?))
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// Runs one import to completion
    ///
    /// Never fails: every problem is reported through the returned outcome.
    pub async fn import_book(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> ImportOutcome {
        let mut reached = ImportStage::Start;

        // Validated but not normalized: the book keeps the URL as given
        let url = match request.validate() {
            Ok(_) => request.url.trim(),
            Err(message) => {
                return self.fail(ImportErrorKind::InvalidRequest, import_message(message), reached)
            }
        };

        if cancel.is_cancelled() {
            return self.fail(ImportErrorKind::Cancelled, import_message(CANCELLED_MESSAGE), reached);
        }

        tracing::info!(
            "Importing {} (author {}, category {})",
            url,
            request.author_id,
            request.category_id
        );

        // 1. References
        if let Err(outcome) = self.validate_references(request, reached) {
            return *outcome;
        }
        advance(&mut reached, ImportStage::ReferencesValidated);

        // 2. Extraction
        let extracted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(ExtractionError::Fetch(FetchError::Cancelled { url: url.to_string() }))
            }
            result = self.scraper.extract_book(url) => result,
        };
        let mut draft = match extracted {
            Ok(draft) => draft,
            Err(e) => return self.fail(extraction_kind(&e), import_message(e), reached),
        };
        advance(&mut reached, ImportStage::Extracted);

        // 3. References travel with the draft
        draft.author_id = Some(request.author_id);
        draft.category_id = Some(request.category_id);

        // 4. Duplicates
        match self.with_store(|store| store.exists_by_isbn(draft.isbn.as_str())) {
            Ok(false) => {}
            Ok(true) => {
                tracing::warn!("Book with ISBN {} already cataloged", draft.isbn);
                return self.fail(
                    ImportErrorKind::DuplicateIsbn,
                    format!("Livro já existe na biblioteca com ISBN: {}", draft.isbn),
                    reached,
                );
            }
            Err(e) => return self.fail(ImportErrorKind::Persistence, import_message(e), reached),
        }
        advance(&mut reached, ImportStage::DedupChecked);

        // 5. Creation
        match self.with_store(|store| store.create_book(&draft)) {
            Ok(book) => {
                advance(&mut reached, ImportStage::Created);
                tracing::info!("Imported book {} (id {}, isbn {})", book.title, book.id, book.isbn);
                ImportOutcome::success(book)
            }
            Err(e @ StorageError::InvalidReference { .. }) => {
                self.fail(ImportErrorKind::InvalidReference, relationship_message(e), reached)
            }
            Err(e @ StorageError::DuplicateIsbn(_)) => {
                self.fail(ImportErrorKind::DuplicateIsbn, import_message(e), reached)
            }
            Err(e) => self.fail(ImportErrorKind::Persistence, import_message(e), reached),
        }
    }

    /// Author first, then category; no fetch happens if either is missing
    fn validate_references(
        &self,
        request: &ImportRequest,
        reached: ImportStage,
    ) -> Result<(), Box<ImportOutcome>> {
        let checks = [
            (ReferenceKind::Author, request.author_id),
            (ReferenceKind::Category, request.category_id),
        ];

        for (kind, id) in checks {
            let found = self.with_store(|store| match kind {
                ReferenceKind::Author => store.find_author(id).map(|a| a.is_some()),
                ReferenceKind::Category => store.find_category(id).map(|c| c.is_some()),
            });

            match found {
                Ok(true) => {}
                Ok(false) => {
                    let e = StorageError::InvalidReference { kind, id };
                    return Err(Box::new(self.fail(
                        ImportErrorKind::InvalidReference,
                        relationship_message(e),
                        reached,
                    )));
                }
                Err(e) => {
                    return Err(Box::new(self.fail(
                        ImportErrorKind::Persistence,
                        import_message(e),
                        reached,
                    )))
                }
            }
        }

        Ok(())
    }

    /// Runs `op` under the store lock; the guard never outlives the call
    fn with_store<T>(&self, op: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| StorageError::Database("catalog lock poisoned".to_string()))?;
        op(&mut store)
    }

    fn fail(&self, kind: ImportErrorKind, message: String, reached: ImportStage) -> ImportOutcome {
        tracing::error!("Import failed after {} ({:?}): {}", reached, kind, message);
        ImportOutcome::failure(kind, message, reached)
    }
}

fn advance(stage: &mut ImportStage, next: ImportStage) {
    debug_assert!(stage.can_transition_to(next), "{} -> {}", stage, next);
    *stage = next;
}

fn extraction_kind(error: &ExtractionError) -> ImportErrorKind {
    match error {
        ExtractionError::Fetch(FetchError::Cancelled { .. }) => ImportErrorKind::Cancelled,
        ExtractionError::Fetch(_) => ImportErrorKind::Fetch,
    }
}

fn import_message(detail: impl std::fmt::Display) -> String {
    format!("Erro na importação: {}", detail)
}

fn relationship_message(detail: impl std::fmt::Display) -> String {
    format!("Erro de relacionamento: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Author, BookRecord, Category};
    use crate::scrape::{DraftBook, IsbnOrigin};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <h1><span id="productTitle">Memórias Póstumas de Brás Cubas</span></h1>
        <span class="a-price"><span class="a-offscreen">R$ 34,90</span></span>
        <div id="detailBullets_feature_div"><ul>
          <li><span><span>Data de publicação :</span> <span>2019</span></span></li>
          <li><span><span>ISBN-13 :</span> <span>978-8535902771</span></span></li>
        </ul></div>
    </body></html>"#;

    /// In-memory store with switchable failures
    #[derive(Default)]
    struct MemoryStore {
        authors: Vec<i64>,
        categories: Vec<i64>,
        books: HashMap<String, BookRecord>,
        fail_create: Option<fn() -> StorageError>,
    }

    impl CatalogStore for MemoryStore {
        fn find_author(&self, id: i64) -> StorageResult<Option<Author>> {
            Ok(self.authors.contains(&id).then(|| Author {
                id,
                name: "Machado de Assis".to_string(),
                email: "machado@example.com".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1839, 6, 21).unwrap(),
            }))
        }

        fn find_category(&self, id: i64) -> StorageResult<Option<Category>> {
            Ok(self.categories.contains(&id).then(|| Category {
                id,
                name: "Romance".to_string(),
                description: None,
            }))
        }

        fn exists_by_isbn(&self, isbn: &str) -> StorageResult<bool> {
            Ok(self.books.contains_key(isbn))
        }

        fn create_book(&mut self, draft: &DraftBook) -> StorageResult<BookRecord> {
            if let Some(make_error) = self.fail_create {
                return Err(make_error());
            }
            let record = BookRecord {
                id: self.books.len() as i64 + 1,
                title: draft.title.clone(),
                isbn: draft.isbn.to_string(),
                isbn_origin: draft.isbn.origin(),
                publication_year: draft.publication_year,
                price: draft.price,
                author_id: draft.author_id.unwrap(),
                category_id: draft.category_id.unwrap(),
                source_url: Some(draft.source_url.clone()),
                created_at: "2024-01-01T00:00:00+00:00".to_string(),
                updated_at: "2024-01-01T00:00:00+00:00".to_string(),
            };
            self.books.insert(record.isbn.clone(), record.clone());
            Ok(record)
        }
    }

    fn importer(store: MemoryStore) -> Importer<MemoryStore> {
        let mut config = Config::default();
        config.fetcher.timeout_ms = 2_000;
        Importer::from_config(Arc::new(Mutex::new(store)), &config).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        MemoryStore {
            authors: vec![1],
            categories: vec![1],
            ..Default::default()
        }
    }

    async fn page_server(expected_fetches: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/livro"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(expected_fetches)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_successful_import() {
        let server = page_server(1).await;
        let importer = importer(seeded_store());
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 1);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;

        assert!(outcome.is_success(), "{}", outcome.message);
        assert_eq!(
            outcome.message,
            "Livro importado com sucesso: Memórias Póstumas de Brás Cubas"
        );
        let book = outcome.imported_book.unwrap();
        assert_eq!(book.isbn, "9788535902771");
        assert_eq!(book.isbn_origin, IsbnOrigin::Extracted);
        assert_eq!(book.author_id, 1);
        assert_eq!(outcome.stage, ImportStage::Created);
    }

    #[tokio::test]
    async fn test_invalid_references_skip_fetch() {
        let server = page_server(0).await;
        let importer = importer(MemoryStore::default());
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 7, 9);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;

        assert_eq!(outcome.status, ImportStatus::Error);
        assert_eq!(outcome.error_kind, Some(ImportErrorKind::InvalidReference));
        assert_eq!(
            outcome.message,
            "Erro de relacionamento: Autor não encontrado com ID: 7"
        );
        assert_eq!(outcome.last_completed, ImportStage::Start);
    }

    #[tokio::test]
    async fn test_missing_category_reported() {
        let server = page_server(0).await;
        let importer = importer(MemoryStore {
            authors: vec![1],
            ..Default::default()
        });
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 5);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;
        assert_eq!(
            outcome.message,
            "Erro de relacionamento: Categoria não encontrada com ID: 5"
        );
    }

    #[tokio::test]
    async fn test_duplicate_isbn_not_created() {
        let server = page_server(2).await;
        let importer = importer(seeded_store());
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 1);
        let cancel = CancellationToken::new();

        assert!(importer.import_book(&request, &cancel).await.is_success());
        let second = importer.import_book(&request, &cancel).await;

        assert_eq!(second.error_kind, Some(ImportErrorKind::DuplicateIsbn));
        assert_eq!(
            second.message,
            "Livro já existe na biblioteca com ISBN: 9788535902771"
        );
        assert_eq!(second.last_completed, ImportStage::Extracted);
        assert_eq!(importer.store().lock().unwrap().books.len(), 1);
    }

    #[tokio::test]
    async fn test_store_reference_failure_uses_relationship_message() {
        let server = page_server(1).await;
        let mut store = seeded_store();
        store.fail_create = Some(|| StorageError::InvalidReference {
            kind: ReferenceKind::Category,
            id: 1,
        });
        let importer = importer(store);
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 1);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;
        assert_eq!(outcome.error_kind, Some(ImportErrorKind::InvalidReference));
        assert_eq!(
            outcome.message,
            "Erro de relacionamento: Categoria não encontrada com ID: 1"
        );
        assert_eq!(outcome.last_completed, ImportStage::DedupChecked);
    }

    #[tokio::test]
    async fn test_store_failure_reported_as_persistence() {
        let server = page_server(1).await;
        let mut store = seeded_store();
        store.fail_create = Some(|| StorageError::Database("disk full".to_string()));
        let importer = importer(store);
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 1);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;
        assert_eq!(outcome.error_kind, Some(ImportErrorKind::Persistence));
        assert_eq!(outcome.message, "Erro na importação: Database error: disk full");
    }

    #[tokio::test]
    async fn test_fetch_failure_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let importer = importer(seeded_store());
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 1);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;
        assert_eq!(outcome.error_kind, Some(ImportErrorKind::Fetch));
        assert!(outcome.message.starts_with("Erro na importação: "));
        assert!(outcome.message.contains("404"));
        assert_eq!(outcome.last_completed, ImportStage::ReferencesValidated);
    }

    #[tokio::test]
    async fn test_source_url_kept_as_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;
        let importer = importer(seeded_store());

        // No trailing slash; the parsed form would add one
        let given = server.uri();
        let request = ImportRequest::new(format!("  {}  ", given), 1, 1);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;
        let book = outcome.imported_book.expect("import should succeed");
        assert_eq!(book.source_url.as_deref(), Some(given.as_str()));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let importer = importer(seeded_store());
        let request = ImportRequest::new("loja.example/livro", 1, 1);

        let outcome = importer.import_book(&request, &CancellationToken::new()).await;
        assert_eq!(outcome.error_kind, Some(ImportErrorKind::InvalidRequest));
        assert_eq!(
            outcome.message,
            "Erro na importação: URL deve começar com http:// ou https://"
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let server = page_server(0).await;
        let importer = importer(seeded_store());
        let request = ImportRequest::new(format!("{}/livro", server.uri()), 1, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = importer.import_book(&request, &cancel).await;
        assert_eq!(outcome.error_kind, Some(ImportErrorKind::Cancelled));
        assert_eq!(outcome.message, "Erro na importação: importação cancelada");
    }
}
