use reindex_catalog::ObjectKind;
use std::fmt;
use std::time::Duration;

/// Counters for one kind of catalog object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub processed: u64,
    pub added: u64,
    pub updated: u64,
    pub removed: u64,
}

/// Statistics about a reindexing pass.
///
/// Filled in as the pass goes, so a failed pass reports how far it got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Identifier rows the catalog matched, possibly including stale metadata
    pub rows: u64,
    /// Documents the index reported under the prefix
    pub documents: u64,
    /// Catalog objects compared with the index
    pub processed: u64,
    pub data_objects: KindStats,
    pub collections: KindStats,
    pub elapsed: Duration,
}

impl PassStats {
    pub fn kind(&self, kind: ObjectKind) -> &KindStats {
        match kind {
            ObjectKind::DataObject => &self.data_objects,
            ObjectKind::Collection => &self.collections,
        }
    }

    pub fn kind_mut(&mut self, kind: ObjectKind) -> &mut KindStats {
        match kind {
            ObjectKind::DataObject => &mut self.data_objects,
            ObjectKind::Collection => &mut self.collections,
        }
    }

    /// Bulk operations the pass queued.
    pub fn operations(&self) -> u64 {
        [&self.data_objects, &self.collections]
            .iter()
            .map(|k| k.added + k.updated + k.removed)
            .sum()
    }

    /// Add another pass's counters to these.
    pub fn accumulate(&mut self, other: &PassStats) {
        self.rows += other.rows;
        self.documents += other.documents;
        self.processed += other.processed;
        for kind in ObjectKind::ALL {
            let mine = self.kind_mut(kind);
            let theirs = other.kind(kind);
            mine.processed += theirs.processed;
            mine.added += theirs.added;
            mine.updated += theirs.updated;
            mine.removed += theirs.removed;
        }
        self.elapsed += other.elapsed;
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data_objects;
        let c = &self.collections;
        write!(
            f,
            "Processed {} entries ({} rows, {} documents, processed {} data objects (+{},U{},-{}), {} colls (+{},U{},-{})) in {:?}",
            self.processed,
            self.rows,
            self.documents,
            d.processed,
            d.added,
            d.updated,
            d.removed,
            c.processed,
            c.added,
            c.updated,
            c.removed,
            self.elapsed
        )
    }
}
