use reindex_catalog::CatalogError;
use reindex_search_index::SearchIndexError;
use std::fmt;
use thiserror::Error;

/// Store whose result count went over the per-prefix cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalitySide {
    Catalog,
    Index,
}

impl fmt::Display for CardinalitySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardinalitySide::Catalog => f.write_str("catalog"),
            CardinalitySide::Index => f.write_str("index"),
        }
    }
}

/// What the bulk indexer was doing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkPhase {
    Index,
    Delete,
    Flush,
}

impl fmt::Display for BulkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkPhase::Index => f.write_str("adding index operation to bulk indexer"),
            BulkPhase::Delete => f.write_str("adding delete operation to bulk indexer"),
            BulkPhase::Flush => f.write_str("flushing bulk indexer"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReindexError {
    #[error("Too many results in prefix ({side}): {count}")]
    TooManyResults { side: CardinalitySide, count: u64 },

    #[error("Invalid prefix {0:?}: expected up to 36 hex digits and hyphens")]
    InvalidPrefix(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Catalog produced a malformed document for {id}: {source}")]
    MalformedProjection {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Got error {phase}: {source}")]
    Bulk {
        phase: BulkPhase,
        #[source]
        source: SearchIndexError,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[source] CatalogError),

    #[error("Search index error: {0}")]
    SearchIndex(#[source] SearchIndexError),
}

impl ReindexError {
    /// Observed count when the pass was refused for holding too many results.
    pub fn too_many_results(&self) -> Option<u64> {
        match self {
            ReindexError::TooManyResults { count, .. } => Some(*count),
            _ => None,
        }
    }
}

impl From<CatalogError> for ReindexError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TooManyResults { count } => ReindexError::TooManyResults {
                side: CardinalitySide::Catalog,
                count,
            },
            other => ReindexError::Catalog(other),
        }
    }
}

impl From<SearchIndexError> for ReindexError {
    fn from(err: SearchIndexError) -> Self {
        match err {
            SearchIndexError::TooManyResults { count } => ReindexError::TooManyResults {
                side: CardinalitySide::Index,
                count,
            },
            other => ReindexError::SearchIndex(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReindexError>;
