/// Import stage definitions for tracking pipeline progress
///
/// This module defines the states a single import passes through.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents how far an import has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    // ===== Active States =====
    /// Nothing has been checked yet
    Start,

    /// Author and category both exist
    ReferencesValidated,

    /// The page was fetched and a draft book extracted
    Extracted,

    /// No book with the draft's ISBN exists yet
    DedupChecked,

    // ===== Terminal States =====
    /// The book was persisted
    Created,

    /// Some step short-circuited the import
    Failed,
}

impl ImportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Created | Self::Failed)
    }

    /// The stage that follows on success, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::ReferencesValidated),
            Self::ReferencesValidated => Some(Self::Extracted),
            Self::Extracted => Some(Self::DedupChecked),
            Self::DedupChecked => Some(Self::Created),
            Self::Created | Self::Failed => None,
        }
    }

    /// Every active stage may fail; otherwise only the next stage is reachable
    pub fn can_transition_to(&self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Failed || self.next() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ReferencesValidated => "references_validated",
            Self::Extracted => "extracted",
            Self::DedupChecked => "dedup_checked",
            Self::Created => "created",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
