use crate::document::DocumentType;
use crate::document::IndexedDocument;
use crate::error::Result;
use crate::error::SearchIndexError;
use crate::index::SearchIndex;
use std::collections::BTreeMap;
use tracing::debug;
use tracing::warn;

/// Point-in-time view of the indexed documents under one prefix.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    total: u64,
    documents: BTreeMap<String, IndexedDocument>,
    types: BTreeMap<String, DocumentType>,
}

impl IndexSnapshot {
    /// Read every file and folder document whose id starts with `prefix`.
    ///
    /// Fails with [`SearchIndexError::TooManyResults`] when the index reports
    /// more than `max_in_prefix` matches. Hits whose source does not parse as a
    /// document are left out, so they get indexed again.
    pub async fn load(
        index: &dyn SearchIndex,
        prefix: &str,
        max_in_prefix: usize,
    ) -> Result<Self> {
        let search = index.search_prefix(prefix, max_in_prefix).await?;
        debug!("Got {} documents for prefix {prefix} (index)", search.total);

        if search.total > max_in_prefix as u64 {
            return Err(SearchIndexError::TooManyResults {
                count: search.total,
            });
        }

        let mut snapshot = IndexSnapshot {
            total: search.total,
            ..Default::default()
        };
        for hit in search.hits {
            let doc: IndexedDocument = match serde_json::from_value(hit.source) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!("Unreadable document {} in index, will reindex: {err}", hit.id);
                    continue;
                }
            };
            if let Some(doc_type) = hit.doc_type.as_deref().and_then(DocumentType::from_name) {
                snapshot.types.insert(hit.id.clone(), doc_type);
            }
            snapshot.documents.insert(hit.id, doc);
        }
        Ok(snapshot)
    }

    /// Total matches reported by the index.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn get(&self, id: &str) -> Option<&IndexedDocument> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Type the index recorded for `id`, if it was a known one.
    pub fn doc_type(&self, id: &str) -> Option<DocumentType> {
        self.types.get(id).copied()
    }

    /// Ids of the readable documents, in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Build a snapshot directly from documents.
    pub fn from_documents(
        documents: impl IntoIterator<Item = (DocumentType, IndexedDocument)>,
    ) -> Self {
        let mut snapshot = IndexSnapshot::default();
        for (doc_type, doc) in documents {
            snapshot.types.insert(doc.id.clone(), doc_type);
            snapshot.documents.insert(doc.id.clone(), doc);
        }
        snapshot.total = snapshot.documents.len() as u64;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemIndex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(id: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            path: format!("/zone/{id}"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn loads_documents_and_types() {
        let index = MemIndex::new();
        index
            .insert_document(DocumentType::File, &doc("ab01"))
            .expect("insert");
        index
            .insert_document(DocumentType::Folder, &doc("AB02"))
            .expect("insert");
        index
            .insert_document(DocumentType::File, &doc("cd01"))
            .expect("insert");

        let snapshot = IndexSnapshot::load(&index, "ab", 10).await.expect("load");

        assert_eq!(snapshot.total(), 2);
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["AB02", "ab01"]);
        assert_eq!(snapshot.doc_type("AB02"), Some(DocumentType::Folder));
        assert_eq!(snapshot.get("ab01"), Some(&doc("ab01")));
        assert!(!snapshot.contains("cd01"));
    }

    #[tokio::test]
    async fn too_many_results_returns_count_only() {
        let index = MemIndex::new();
        for i in 0..3 {
            index
                .insert_document(DocumentType::File, &doc(&format!("ab0{i}")))
                .expect("insert");
        }

        let err = IndexSnapshot::load(&index, "ab", 2)
            .await
            .expect_err("cap exceeded");
        assert!(matches!(err, SearchIndexError::TooManyResults { count: 3 }));
    }

    #[test_log::test(tokio::test)]
    async fn unreadable_hits_are_skipped() {
        let index = MemIndex::new();
        index.insert_raw("ab01", Some("file"), json!({"id": "ab01", "fileSize": "huge"}));
        index
            .insert_document(DocumentType::File, &doc("ab02"))
            .expect("insert");

        let snapshot = IndexSnapshot::load(&index, "ab", 10).await.expect("load");

        assert_eq!(snapshot.total(), 2);
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains("ab01"));
    }

    #[tokio::test]
    async fn unknown_types_are_not_recorded() {
        let index = MemIndex::new();
        index.insert_raw("ab01", Some("_doc"), json!({"id": "ab01"}));
        index.insert_raw("ab02", None, json!({"id": "ab02"}));

        let snapshot = IndexSnapshot::load(&index, "ab", 10).await.expect("load");

        assert!(snapshot.contains("ab01"));
        assert!(snapshot.contains("ab02"));
        assert_eq!(snapshot.doc_type("ab01"), None);
        assert_eq!(snapshot.doc_type("ab02"), None);
    }
}
