//! In-memory catalog for tests and dry runs.

use crate::error::CatalogError;
use crate::error::Result;
use crate::projection::Relation;
use crate::scope::Catalog;
use crate::scope::ObjectKind;
use crate::scope::ProjectedRow;
use crate::scope::ReadScope;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone)]
struct MemObject {
    id: String,
    kind: ObjectKind,
    document: Value,
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    released: AtomicUsize,
}

/// Failures the next scopes will report.
#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    fail_project: bool,
    fail_rows_after: Option<usize>,
}

fn injected(relation: &'static str) -> CatalogError {
    CatalogError::Query {
        relation,
        source: sqlx::Error::Protocol("injected failure".to_string()),
    }
}

/// Catalog holding objects in memory. Each read scope works on a copy taken
/// when it was opened, so later inserts are invisible to it.
#[derive(Debug, Default, Clone)]
pub struct MemCatalog {
    objects: Arc<Mutex<Vec<MemObject>>>,
    counters: Arc<Counters>,
    faults: Arc<Mutex<Faults>>,
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. The document's `id` is set to the lower-cased UUID.
    pub fn insert(&self, kind: ObjectKind, uuid: &str, mut document: Value) {
        let id = uuid.to_lowercase();
        if let Value::Object(fields) = &mut document {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }
        self.lock().push(MemObject { id, kind, document });
    }

    /// Number of scopes opened so far
    pub fn scopes_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Number of scopes given back through [`ReadScope::release`]
    pub fn scopes_released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Make [`ReadScope::project`] fail with a query error in scopes opened
    /// from now on.
    pub fn fail_project(&self) {
        self.faults().fail_project = true;
    }

    /// Make row streams of scopes opened from now on fail with a query error
    /// once `n` rows have been read from the scope.
    pub fn fail_rows_after(&self, n: usize) {
        self.faults().fail_rows_after = Some(n);
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Catalog for MemCatalog {
    async fn begin_read_scope(&self) -> Result<Box<dyn ReadScope>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemReadScope {
            objects: self.lock().clone(),
            projected: None,
            counters: Arc::clone(&self.counters),
            faults: *self.faults(),
            rows_read: 0,
        }))
    }
}

struct MemReadScope {
    objects: Vec<MemObject>,
    projected: Option<Vec<MemObject>>,
    counters: Arc<Counters>,
    faults: Faults,
    rows_read: usize,
}

#[async_trait]
impl ReadScope for MemReadScope {
    async fn project(&mut self, prefix: &str, max_in_prefix: usize) -> Result<u64> {
        if self.faults.fail_project {
            return Err(injected(Relation::BaseObjectUuids.name()));
        }
        let prefix = prefix.to_lowercase();
        let mut matching: Vec<MemObject> = self
            .objects
            .iter()
            .filter(|object| object.id.starts_with(&prefix))
            .cloned()
            .collect();
        let count = matching.len() as u64;
        if matching.len() > max_in_prefix {
            return Err(CatalogError::TooManyResults { count });
        }
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        self.projected = Some(matching);
        Ok(count)
    }

    fn rows(&mut self, kind: ObjectKind) -> BoxStream<'_, Result<ProjectedRow>> {
        let Some(projected) = &self.projected else {
            return stream::once(async { Err(CatalogError::NotProjected) }).boxed();
        };
        let mut rows: Vec<Result<ProjectedRow>> = Vec::new();
        for object in projected.iter().filter(|object| object.kind == kind) {
            if self.faults.fail_rows_after == Some(self.rows_read) {
                rows.push(Err(injected(kind.rows_relation())));
                break;
            }
            self.rows_read += 1;
            rows.push(
                serde_json::to_string(&object.document)
                    .map(|document| ProjectedRow {
                        id: object.id.clone(),
                        document,
                    })
                    .map_err(CatalogError::from),
            );
        }
        stream::iter(rows).boxed()
    }

    async fn release(self: Box<Self>) -> Result<()> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
