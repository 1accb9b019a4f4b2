use crate::error::{ReindexError, Result};
use reindex_search_index::{IndexSnapshot, IndexedDocument};

/// Outcome of comparing one catalog object with the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Index already holds an equal document
    NoAction,
    /// Not in the index yet
    IndexDocument,
    /// Indexed, but the document differs
    UpdateDocument,
}

impl Classification {
    pub fn needs_indexing(self) -> bool {
        !matches!(self, Classification::NoAction)
    }
}

/// Decide what to do with the catalog document `document` for `id`.
///
/// The document is only parsed when `id` is in the snapshot; a parse failure
/// there is an error for the whole pass.
pub fn classify(id: &str, document: &str, snapshot: &IndexSnapshot) -> Result<Classification> {
    let Some(indexed) = snapshot.get(id) else {
        return Ok(Classification::IndexDocument);
    };

    let projected: IndexedDocument =
        serde_json::from_str(document).map_err(|source| ReindexError::MalformedProjection {
            id: id.to_string(),
            source,
        })?;

    if projected == *indexed {
        Ok(Classification::NoAction)
    } else {
        Ok(Classification::UpdateDocument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reindex_search_index::{DocumentType, Metadatum};

    fn document(id: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            path: format!("/zone/home/{id}"),
            label: id.to_string(),
            creator: "rods#zone".to_string(),
            file_type: "generic".to_string(),
            date_created: 1_000,
            date_modified: 2_000,
            file_size: 42,
            metadata: vec![
                Metadatum::new("a", "1", ""),
                Metadatum::new("b", "2", "m"),
            ],
            user_permissions: Vec::new(),
        }
    }

    fn snapshot(docs: &[IndexedDocument]) -> IndexSnapshot {
        IndexSnapshot::from_documents(docs.iter().cloned().map(|doc| (DocumentType::File, doc)))
    }

    #[test]
    fn absent_ids_are_indexed_without_parsing() -> anyhow::Result<()> {
        let snapshot = snapshot(&[document("u9")]);
        assert_eq!(
            classify("u1", "not json at all", &snapshot)?,
            Classification::IndexDocument
        );
        Ok(())
    }

    #[test]
    fn equal_documents_need_nothing() -> anyhow::Result<()> {
        let indexed = document("u4");
        let mut projected = indexed.clone();
        projected.metadata.reverse();
        let json = serde_json::to_string(&projected)?;

        assert_eq!(
            classify("u4", &json, &snapshot(&[indexed]))?,
            Classification::NoAction
        );
        Ok(())
    }

    #[test]
    fn differing_documents_are_updated() -> anyhow::Result<()> {
        let indexed = document("u2");
        let mut projected = indexed.clone();
        projected.date_modified += 10;
        let json = serde_json::to_string(&projected)?;

        let classification = classify("u2", &json, &snapshot(&[indexed]))?;
        assert_eq!(classification, Classification::UpdateDocument);
        assert!(classification.needs_indexing());
        Ok(())
    }

    #[test]
    fn malformed_projection_is_fatal() {
        let err = classify("u2", "{\"fileSize\": \"big\"}", &snapshot(&[document("u2")]));
        match err {
            Err(ReindexError::MalformedProjection { id, .. }) => assert_eq!(id, "u2"),
            other => panic!("expected malformed projection, got {other:?}"),
        }
    }
}
