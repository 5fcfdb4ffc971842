//! Integration tests for the import pipeline
//!
//! These tests use wiremock to serve product pages and run full imports
//! against a real SQLite catalog.

use biblioteca::catalog::{NewAuthor, NewCategory, SqliteCatalog};
use biblioteca::config::Config;
use biblioteca::import::{ImportErrorKind, ImportStage};
use biblioteca::{ImportRequest, ImportStatus, Importer, IsbnOrigin};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_PAGE: &str = r#"<html><head><title>Loja</title></head><body>
    <h1><span id="productTitle"> Quincas Borba </span></h1>
    <span class="a-price"><span class="a-offscreen">R$ 42,50</span></span>
    <div id="detailBullets_feature_div"><ul>
      <li><span><span class="a-text-bold">Data de publicação :</span> <span>3 março 2016</span></span></li>
      <li><span><span class="a-text-bold">ISBN-13 :</span> <span>978-8544001820</span></span></li>
    </ul></div>
</body></html>"#;

struct Fixture {
    importer: Importer<SqliteCatalog>,
    author_id: i64,
    category_id: i64,
}

impl Fixture {
    fn request(&self, url: String) -> ImportRequest {
        ImportRequest::new(url, self.author_id, self.category_id)
    }

    fn count_books(&self) -> u64 {
        self.importer
            .store()
            .lock()
            .unwrap()
            .count_books()
            .expect("Failed to count books")
    }
}

/// Creates an importer over an in-memory catalog with one author and one category
fn create_fixture(config: Config) -> Fixture {
    let mut catalog = SqliteCatalog::new_in_memory().expect("Failed to create catalog");
    let author = catalog
        .create_author(&NewAuthor {
            name: "Machado de Assis".to_string(),
            email: "machado@example.com".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1839, 6, 21).unwrap(),
        })
        .expect("Failed to create author");
    let category = catalog
        .create_category(&NewCategory {
            name: "Romance".to_string(),
            description: None,
        })
        .expect("Failed to create category");

    let importer = Importer::from_config(Arc::new(Mutex::new(catalog)), &config)
        .expect("Failed to create importer");

    Fixture {
        importer,
        author_id: author.id,
        category_id: category.id,
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.fetcher.timeout_ms = 2_000;
    config
}

async fn serve_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_import_persists_book() {
    let server = MockServer::start().await;
    serve_page(&server, "/quincas-borba", PRODUCT_PAGE).await;

    let fixture = create_fixture(test_config());
    let url = format!("{}/quincas-borba", server.uri());

    let outcome = fixture
        .importer
        .import_book(&fixture.request(url.clone()), &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, ImportStatus::Success, "{}", outcome.message);
    assert_eq!(outcome.message, "Livro importado com sucesso: Quincas Borba");

    let book = outcome.imported_book.expect("Missing imported record");
    assert_eq!(book.title, "Quincas Borba");
    assert_eq!(book.price, Decimal::new(4250, 2));
    assert_eq!(book.isbn, "9788544001820");
    assert_eq!(book.publication_year, 2016);
    assert_eq!(book.author_id, fixture.author_id);
    assert_eq!(book.category_id, fixture.category_id);
    assert_eq!(book.source_url.as_deref(), Some(url.as_str()));

    let stored = fixture
        .importer
        .store()
        .lock()
        .unwrap()
        .find_book_by_isbn("9788544001820")
        .expect("Lookup failed");
    assert_eq!(stored, Some(book));
}

#[tokio::test]
async fn test_second_import_is_duplicate() {
    let server = MockServer::start().await;
    serve_page(&server, "/quincas-borba", PRODUCT_PAGE).await;

    let fixture = create_fixture(test_config());
    let request = fixture.request(format!("{}/quincas-borba", server.uri()));
    let cancel = CancellationToken::new();

    let first = fixture.importer.import_book(&request, &cancel).await;
    assert!(first.is_success());

    let second = fixture.importer.import_book(&request, &cancel).await;
    assert_eq!(second.status, ImportStatus::Error);
    assert_eq!(second.error_kind, Some(ImportErrorKind::DuplicateIsbn));
    assert_eq!(
        second.message,
        "Livro já existe na biblioteca com ISBN: 9788544001820"
    );
    assert_eq!(fixture.count_books(), 1);
}

#[tokio::test]
async fn test_invalid_references_never_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let fixture = create_fixture(test_config());
    let request = ImportRequest::new(format!("{}/quincas-borba", server.uri()), 404, 405);

    let outcome = fixture
        .importer
        .import_book(&request, &CancellationToken::new())
        .await;

    assert_eq!(outcome.error_kind, Some(ImportErrorKind::InvalidReference));
    assert_eq!(
        outcome.message,
        "Erro de relacionamento: Autor não encontrado com ID: 404"
    );
    assert_eq!(outcome.last_completed, ImportStage::Start);
    assert_eq!(fixture.count_books(), 0);
}

#[tokio::test]
async fn test_fetch_timeout_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PRODUCT_PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.fetcher.timeout_ms = 300;
    let fixture = create_fixture(config);

    let outcome = fixture
        .importer
        .import_book(
            &fixture.request(format!("{}/lento", server.uri())),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.error_kind, Some(ImportErrorKind::Fetch));
    assert!(outcome.message.starts_with("Erro na importação: "));
    assert!(outcome.message.contains("timed out"), "{}", outcome.message);
    assert_eq!(fixture.count_books(), 0);
}

#[tokio::test]
async fn test_missing_page_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fixture = create_fixture(test_config());
    let outcome = fixture
        .importer
        .import_book(
            &fixture.request(format!("{}/sumiu", server.uri())),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.status, ImportStatus::Error);
    assert!(outcome.message.contains("404"), "{}", outcome.message);
    assert_eq!(fixture.count_books(), 0);
}

#[tokio::test]
async fn test_cancellation_during_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PRODUCT_PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.fetcher.timeout_ms = 10_000;
    let fixture = create_fixture(config);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = fixture
        .importer
        .import_book(&fixture.request(format!("{}/lento", server.uri())), &cancel)
        .await;

    assert_eq!(outcome.error_kind, Some(ImportErrorKind::Cancelled));
    assert_eq!(outcome.last_completed, ImportStage::ReferencesValidated);
    assert_eq!(fixture.count_books(), 0);
}

#[tokio::test]
async fn test_comma_price_and_generated_isbn() {
    let server = MockServer::start().await;
    serve_page(
        &server,
        "/sem-isbn",
        r#"<html><body>
            <span id="productTitle">Helena</span>
            <span class="a-price-whole">19,90</span>
        </body></html>"#,
    )
    .await;

    let fixture = create_fixture(test_config());
    let outcome = fixture
        .importer
        .import_book(
            &fixture.request(format!("{}/sem-isbn", server.uri())),
            &CancellationToken::new(),
        )
        .await;

    let book = outcome.imported_book.expect("Import should succeed");
    assert_eq!(book.price, Decimal::new(1990, 2));
    assert_eq!(book.isbn.len(), 13);
    assert!(book.isbn.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(book.isbn_origin, IsbnOrigin::Generated);
    assert_eq!(book.publication_year, 2023);
}

#[tokio::test]
async fn test_concurrent_imports_of_distinct_pages() {
    let server = MockServer::start().await;
    let isbns = ["9788544001820", "9788535914849", "9788572326972"];
    for (i, isbn) in isbns.iter().enumerate() {
        let page = format!(
            r#"<html><body>
                <span id="productTitle">Livro {i}</span>
                <div id="detailBullets_feature_div">
                  <span><span>ISBN-13 :</span> <span>{isbn}</span></span>
                </div>
            </body></html>"#
        );
        serve_page(&server, &format!("/livro-{}", i), &page).await;
    }

    let fixture = create_fixture(test_config());
    let mut handles = Vec::new();
    for i in 0..isbns.len() {
        let importer = fixture.importer.clone();
        let request = fixture.request(format!("{}/livro-{}", server.uri(), i));
        handles.push(tokio::spawn(async move {
            importer.import_book(&request, &CancellationToken::new()).await
        }));
    }

    for handle in handles {
        let outcome = handle.await.expect("Import task panicked");
        assert!(outcome.is_success(), "{}", outcome.message);
    }
    assert_eq!(fixture.count_books(), 3);
}

#[tokio::test]
async fn test_racing_imports_of_same_isbn() {
    let server = MockServer::start().await;
    serve_page(&server, "/quincas-borba", PRODUCT_PAGE).await;

    let fixture = create_fixture(test_config());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let importer = fixture.importer.clone();
        let request = fixture.request(format!("{}/quincas-borba", server.uri()));
        handles.push(tokio::spawn(async move {
            importer.import_book(&request, &CancellationToken::new()).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        let outcome = handle.await.expect("Import task panicked");
        if outcome.is_success() {
            successes += 1;
        } else {
            assert_eq!(outcome.error_kind, Some(ImportErrorKind::DuplicateIsbn));
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(fixture.count_books(), 1);
}

#[tokio::test]
async fn test_import_into_file_catalog() {
    let server = MockServer::start().await;
    serve_page(&server, "/quincas-borba", PRODUCT_PAGE).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("biblioteca.db");

    let (author_id, category_id) = {
        let mut catalog = SqliteCatalog::new(&db_path).expect("Failed to open catalog");
        let author = catalog
            .create_author(&NewAuthor {
                name: "Aluísio Azevedo".to_string(),
                email: "aluisio@example.com".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1857, 4, 14).unwrap(),
            })
            .unwrap();
        let category = catalog
            .create_category(&NewCategory {
                name: "Naturalismo".to_string(),
                description: Some("Romances naturalistas".to_string()),
            })
            .unwrap();
        (author.id, category.id)
    };

    let catalog = SqliteCatalog::new(&db_path).expect("Failed to reopen catalog");
    let importer = Importer::from_config(Arc::new(Mutex::new(catalog)), &test_config()).unwrap();
    let request = ImportRequest::new(
        format!("{}/quincas-borba", server.uri()),
        author_id,
        category_id,
    );
    assert!(importer
        .import_book(&request, &CancellationToken::new())
        .await
        .is_success());
    drop(importer);

    let reopened = SqliteCatalog::new(&db_path).expect("Failed to reopen catalog");
    let books = reopened.list_books().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].isbn, "9788544001820");
}
