use crate::classify::{Classification, classify};
use crate::config::ReindexConfig;
use crate::error::{BulkPhase, ReindexError, Result};
use crate::stats::PassStats;
use futures::TryStreamExt;
use reindex_catalog::{Catalog, ObjectKind, ProjectedRow, ReadScope};
use reindex_search_index::{BulkIndexer, BulkOperation, DocumentType, IndexSnapshot, SearchIndex};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Longest prefix accepted: a full hyphenated UUID
pub const MAX_PREFIX_LEN: usize = 36;

/// Progress callback for reindexing passes
pub type ProgressCallback = Arc<dyn Fn(PassProgress) + Send + Sync>;

/// Reindexing progress information
#[derive(Debug, Clone)]
pub struct PassProgress {
    pub prefix: String,
    pub phase: PassPhase,
    /// Catalog objects compared so far
    pub processed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPhase {
    Setup,
    ProjectCatalog,
    SnapshotIndex,
    ClassifyFiles,
    ClassifyFolders,
    ComputeDeletions,
    FinalFlush,
    Done,
    Aborted,
}

impl PassPhase {
    fn classifying(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::DataObject => PassPhase::ClassifyFiles,
            ObjectKind::Collection => PassPhase::ClassifyFolders,
        }
    }
}

/// Reconciles the search index with the catalog, one UUID prefix at a time.
///
/// Passes share nothing but the configuration, so several may run at once
/// for different prefixes.
pub struct Reindexer {
    catalog: Arc<dyn Catalog>,
    index: Arc<dyn SearchIndex>,
    config: ReindexConfig,
    progress: Option<ProgressCallback>,
}

impl Reindexer {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        index: Arc<dyn SearchIndex>,
        config: ReindexConfig,
    ) -> Result<Self> {
        config.validate().map_err(ReindexError::Config)?;
        Ok(Self {
            catalog,
            index,
            config,
            progress: None,
        })
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    /// Bring the index in line with the catalog for every object whose UUID
    /// starts with `prefix`.
    ///
    /// A prefix holding more than `max_in_prefix` objects on either side fails
    /// with [`ReindexError::TooManyResults`] before anything is sent to the
    /// index; the caller is expected to retry with longer prefixes. Other
    /// failures abort the pass, leaving batches already flushed in place.
    pub async fn reindex_prefix(&self, prefix: &str) -> Result<PassStats> {
        validate_prefix(prefix)?;
        let span = info_span!("reindex_prefix", prefix = %prefix);
        self.run_pass(prefix).instrument(span).await
    }

    async fn run_pass(&self, prefix: &str) -> Result<PassStats> {
        debug!("Indexing prefix {prefix}");
        let start = Instant::now();
        let mut stats = PassStats::default();
        self.report(prefix, PassPhase::Setup, &stats);

        let result = self.run_in_scope(prefix, &mut stats).await;

        stats.elapsed = start.elapsed();
        info!("{stats}");
        match result {
            Ok(()) => {
                self.report(prefix, PassPhase::Done, &stats);
                Ok(stats)
            }
            Err(err) => {
                self.report(prefix, PassPhase::Aborted, &stats);
                Err(err)
            }
        }
    }

    /// Run the pass inside a catalog read scope, releasing it on every path.
    async fn run_in_scope(&self, prefix: &str, stats: &mut PassStats) -> Result<()> {
        let mut scope = self.catalog.begin_read_scope().await?;
        let result = self.reconcile(scope.as_mut(), prefix, stats).await;
        let released = scope.release().await;

        match (result, released) {
            (Err(err), Err(release_err)) => {
                warn!("Failed to release catalog scope after error: {release_err}");
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Ok(()), released) => released.map_err(ReindexError::from),
        }
    }

    async fn reconcile(
        &self,
        scope: &mut dyn ReadScope,
        prefix: &str,
        stats: &mut PassStats,
    ) -> Result<()> {
        let max_in_prefix = self.config.max_in_prefix;

        self.report(prefix, PassPhase::ProjectCatalog, stats);
        let rows = scope
            .project(prefix, max_in_prefix)
            .await
            .map_err(ReindexError::from);
        if let Err(err) = &rows {
            stats.rows = err.too_many_results().unwrap_or_default();
        }
        stats.rows = rows?;

        self.report(prefix, PassPhase::SnapshotIndex, stats);
        let snapshot = IndexSnapshot::load(self.index.as_ref(), prefix, max_in_prefix)
            .await
            .map_err(ReindexError::from);
        if let Err(err) = &snapshot {
            stats.documents = err.too_many_results().unwrap_or_default();
        }
        let snapshot = snapshot?;
        stats.documents = snapshot.total();

        let mut bulk = BulkIndexer::new(self.index.as_ref(), self.config.batch_size);
        let outcome = self
            .sync(scope, prefix, &snapshot, &mut bulk, stats)
            .await;

        self.report(prefix, PassPhase::FinalFlush, stats);
        match outcome {
            Ok(()) => {
                if bulk.can_flush() {
                    bulk.flush().await.map_err(|source| ReindexError::Bulk {
                        phase: BulkPhase::Flush,
                        source,
                    })?;
                }
                Ok(())
            }
            Err(err) => {
                if bulk.can_flush() {
                    debug!("Flushing {} operations queued before the error", bulk.pending());
                    if let Err(flush_err) = bulk.flush().await {
                        warn!("Failed to flush bulk indexer after error: {flush_err}");
                    }
                }
                Err(err)
            }
        }
    }

    /// Queue index operations for new and changed objects, then deletes for
    /// indexed documents the catalog no longer has.
    async fn sync(
        &self,
        scope: &mut dyn ReadScope,
        prefix: &str,
        snapshot: &IndexSnapshot,
        bulk: &mut BulkIndexer<'_>,
        stats: &mut PassStats,
    ) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::with_capacity(snapshot.len());

        for kind in ObjectKind::ALL {
            self.report(prefix, PassPhase::classifying(kind), stats);
            let doc_type = kind.document_type();
            let mut rows = scope.rows(kind);
            while let Some(ProjectedRow { id, document }) = rows.try_next().await? {
                let classification = classify(&id, &document, snapshot)?;
                match classification {
                    Classification::UpdateDocument => {
                        debug!("{kind} {id}, documents differ, indexing");
                        stats.kind_mut(kind).updated += 1;
                    }
                    Classification::IndexDocument => {
                        debug!("{kind} {id} not in index, indexing");
                        stats.kind_mut(kind).added += 1;
                    }
                    Classification::NoAction => {}
                }

                if classification.needs_indexing() {
                    bulk.add(BulkOperation::index(doc_type, id.clone(), document))
                        .await
                        .map_err(|source| ReindexError::Bulk {
                            phase: BulkPhase::Index,
                            source,
                        })?;
                }

                seen.insert(id);
                stats.processed += 1;
                stats.kind_mut(kind).processed += 1;
            }

            let counts = stats.kind(kind);
            debug!(
                "{} {kind}s missing, {} {kind}s to update",
                counts.added, counts.updated
            );
        }

        self.report(prefix, PassPhase::ComputeDeletions, stats);
        for id in snapshot.ids().filter(|id| !seen.contains(*id)) {
            let doc_type = snapshot.doc_type(id).unwrap_or_else(|| {
                error!("Could not find type for document {id}, assuming file");
                DocumentType::File
            });
            match doc_type {
                DocumentType::File => {
                    debug!("data-object {id} not seen in catalog, deleting");
                    stats.data_objects.removed += 1;
                }
                DocumentType::Folder => {
                    debug!("collection {id} not seen in catalog, deleting");
                    stats.collections.removed += 1;
                }
            }
            bulk.add(BulkOperation::delete(doc_type, id))
                .await
                .map_err(|source| ReindexError::Bulk {
                    phase: BulkPhase::Delete,
                    source,
                })?;
        }

        debug!(
            "{} data-objects to delete, {} collections to delete",
            stats.data_objects.removed, stats.collections.removed
        );
        Ok(())
    }

    fn report(&self, prefix: &str, phase: PassPhase, stats: &PassStats) {
        if let Some(cb) = &self.progress {
            cb(PassProgress {
                prefix: prefix.to_string(),
                phase,
                processed: stats.processed,
            });
        }
    }
}

/// Check that `prefix` can only match UUIDs: hex digits and hyphens, at most
/// [`MAX_PREFIX_LEN`] long.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let valid = prefix.len() <= MAX_PREFIX_LEN
        && prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ReindexError::InvalidPrefix(prefix.to_string()))
    }
}
