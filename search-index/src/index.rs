use crate::document::DocumentType;
use crate::error::Result;
use async_trait::async_trait;

/// One document returned by a prefix search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id as stored in the index
    pub id: String,

    /// Type name recorded by the index, if any
    pub doc_type: Option<String>,

    /// Raw document source
    pub source: serde_json::Value,
}

/// Result of a prefix search: the total number of matches reported by the
/// index, and at most `limit` of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

/// A single write in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOperation {
    /// Index (create or overwrite) `id` with the given JSON source
    Index {
        doc_type: DocumentType,
        id: String,
        source: String,
    },
    /// Remove `id` from the index
    Delete { doc_type: DocumentType, id: String },
}

impl BulkOperation {
    pub fn index(doc_type: DocumentType, id: impl Into<String>, source: impl Into<String>) -> Self {
        BulkOperation::Index {
            doc_type,
            id: id.into(),
            source: source.into(),
        }
    }

    pub fn delete(doc_type: DocumentType, id: impl Into<String>) -> Self {
        BulkOperation::Delete {
            doc_type,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Index { id, .. } | BulkOperation::Delete { id, .. } => id,
        }
    }

    pub fn doc_type(&self) -> DocumentType {
        match self {
            BulkOperation::Index { doc_type, .. } | BulkOperation::Delete { doc_type, .. } => {
                *doc_type
            }
        }
    }
}

/// The operations a reconciliation pass needs from a search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Finds file and folder documents whose id starts with `prefix` in either
    /// upper- or lower-case form, sorted by id, returning at most `limit` hits.
    async fn search_prefix(&self, prefix: &str, limit: usize) -> Result<SearchHits>;

    /// Applies `operations` in a single request.
    async fn bulk(&self, operations: &[BulkOperation]) -> Result<()>;
}
