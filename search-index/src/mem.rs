//! In-memory [`SearchIndex`], used for tests and dry runs.

use crate::document::DocumentType;
use crate::document::IndexedDocument;
use crate::error::Result;
use crate::error::SearchIndexError;
use crate::index::BulkOperation;
use crate::index::SearchHit;
use crate::index::SearchHits;
use crate::index::SearchIndex;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

#[derive(Debug, Clone)]
struct StoredDocument {
    doc_type: Option<String>,
    source: serde_json::Value,
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<String, StoredDocument>,
    batches: Vec<Vec<BulkOperation>>,
    fail_bulk: bool,
    fail_search: bool,
}

/// Search index held in a sorted map, recording every bulk request it receives.
#[derive(Debug, Default)]
pub struct MemIndex {
    state: Mutex<State>,
}

impl MemIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `document` under its own id.
    pub fn insert_document(&self, doc_type: DocumentType, document: &IndexedDocument) -> Result<()> {
        let source = serde_json::to_value(document)?;
        self.insert_raw(&document.id, Some(doc_type.as_str()), source);
        Ok(())
    }

    /// Store an arbitrary source, including ones that are not valid documents.
    pub fn insert_raw(&self, id: &str, doc_type: Option<&str>, source: serde_json::Value) {
        self.lock().documents.insert(
            id.to_string(),
            StoredDocument {
                doc_type: doc_type.map(str::to_string),
                source,
            },
        );
    }

    /// Make every subsequent bulk request fail.
    pub fn fail_bulk_requests(&self) {
        self.lock().fail_bulk = true;
    }

    /// Make every subsequent prefix search fail.
    pub fn fail_search_requests(&self) {
        self.lock().fail_search = true;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().documents.contains_key(id)
    }

    pub fn document(&self, id: &str) -> Option<serde_json::Value> {
        self.lock().documents.get(id).map(|d| d.source.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every bulk request received so far, in order.
    pub fn batches(&self) -> Vec<Vec<BulkOperation>> {
        self.lock().batches.clone()
    }

    /// All bulk operations received so far, flattened.
    pub fn operations(&self) -> Vec<BulkOperation> {
        self.lock().batches.iter().flatten().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SearchIndex for MemIndex {
    async fn search_prefix(&self, prefix: &str, limit: usize) -> Result<SearchHits> {
        let upper = prefix.to_uppercase();
        let lower = prefix.to_lowercase();
        let state = self.lock();
        if state.fail_search {
            return Err(SearchIndexError::SearchFailed(format!(
                "search for prefix {prefix} rejected"
            )));
        }
        let matching: Vec<(&String, &StoredDocument)> = state
            .documents
            .iter()
            .filter(|(id, _)| id.starts_with(&upper) || id.starts_with(&lower))
            .collect();
        Ok(SearchHits {
            total: matching.len() as u64,
            hits: matching
                .into_iter()
                .take(limit)
                .map(|(id, doc)| SearchHit {
                    id: id.clone(),
                    doc_type: doc.doc_type.clone(),
                    source: doc.source.clone(),
                })
                .collect(),
        })
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> Result<()> {
        let mut state = self.lock();
        if state.fail_bulk {
            return Err(SearchIndexError::BulkFailed(format!(
                "rejected {} operations",
                operations.len()
            )));
        }
        for op in operations {
            match op {
                BulkOperation::Index {
                    doc_type,
                    id,
                    source,
                } => {
                    let source = serde_json::from_str(source)?;
                    state.documents.insert(
                        id.clone(),
                        StoredDocument {
                            doc_type: Some(doc_type.as_str().to_string()),
                            source,
                        },
                    );
                }
                BulkOperation::Delete { id, .. } => {
                    state.documents.remove(id);
                }
            }
        }
        state.batches.push(operations.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn prefix_search_matches_either_case_and_caps_hits() {
        let index = MemIndex::new();
        index.insert_raw("ab01", Some("file"), json!({}));
        index.insert_raw("AB02", Some("folder"), json!({}));
        index.insert_raw("aB03", Some("file"), json!({}));
        index.insert_raw("cd01", Some("file"), json!({}));

        let hits = index.search_prefix("Ab", 1).await.expect("search");
        assert_eq!(hits.total, 2);
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].id, "AB02");
    }

    #[tokio::test]
    async fn failing_search_reports_the_prefix() {
        let index = MemIndex::new();
        index.insert_raw("ab01", Some("file"), json!({}));
        index.fail_search_requests();

        let err = index.search_prefix("ab", 10).await;
        assert!(matches!(err, Err(SearchIndexError::SearchFailed(msg)) if msg.contains("ab")));
    }

    #[tokio::test]
    async fn bulk_applies_and_records_operations() {
        let index = MemIndex::new();
        index.insert_raw("u3", Some("folder"), json!({"id": "u3"}));

        let ops = vec![
            BulkOperation::index(DocumentType::File, "u1", r#"{"id":"u1"}"#),
            BulkOperation::delete(DocumentType::Folder, "u3"),
        ];
        index.bulk(&ops).await.expect("bulk");

        assert!(index.contains("u1"));
        assert!(!index.contains("u3"));
        assert_eq!(index.batches(), vec![ops]);
    }
}
