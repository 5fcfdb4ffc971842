//! Request and outcome types for the import pipeline

use crate::catalog::BookRecord;
use crate::import::stage::ImportStage;
use serde::{Deserialize, Serialize};
use url::Url;

pub(crate) const INVALID_URL_MESSAGE: &str = "URL deve começar com http:// ou https://";

/// A request to import one book page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub url: String,
    pub author_id: i64,
    pub category_id: i64,
}

impl ImportRequest {
    pub fn new(url: impl Into<String>, author_id: i64, category_id: i64) -> Self {
        Self {
            url: url.into(),
            author_id,
            category_id,
        }
    }

    /// Checks the URL is a non-blank absolute http(s) URL
    pub fn validate(&self) -> Result<Url, &'static str> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err(INVALID_URL_MESSAGE);
        }

        let parsed = Url::parse(trimmed).map_err(|_| INVALID_URL_MESSAGE)?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            _ => Err(INVALID_URL_MESSAGE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportStatus {
    Success,
    Error,
}

/// Why an import failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportErrorKind {
    /// The request itself was malformed
    InvalidRequest,
    /// The author or category does not exist
    InvalidReference,
    /// The page could not be retrieved
    Fetch,
    /// A book with the same ISBN is already cataloged
    DuplicateIsbn,
    /// The store failed
    Persistence,
    /// The caller cancelled the import
    Cancelled,
}

/// The result of one import, success or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub status: ImportStatus,
    pub message: String,
    #[serde(rename = "importedRecord", skip_serializing_if = "Option::is_none", default)]
    pub imported_book: Option<BookRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_kind: Option<ImportErrorKind>,
    /// Either `Created` or `Failed`
    pub stage: ImportStage,
    /// The furthest stage completed before the import ended
    pub last_completed: ImportStage,
}

impl ImportOutcome {
    pub fn success(book: BookRecord) -> Self {
        Self {
            status: ImportStatus::Success,
            message: format!("Livro importado com sucesso: {}", book.title),
            imported_book: Some(book),
            error_kind: None,
            stage: ImportStage::Created,
            last_completed: ImportStage::Created,
        }
    }

    pub fn failure(kind: ImportErrorKind, message: impl Into<String>, reached: ImportStage) -> Self {
        Self {
            status: ImportStatus::Error,
            message: message.into(),
            imported_book: None,
            error_kind: Some(kind),
            stage: ImportStage::Failed,
            last_completed: reached,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ImportStatus::Success
    }
}
