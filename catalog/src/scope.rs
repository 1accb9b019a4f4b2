use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use reindex_search_index::DocumentType;
use std::fmt;

/// Kind of catalog object a projected row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A file
    DataObject,
    /// A folder
    Collection,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 2] = [ObjectKind::DataObject, ObjectKind::Collection];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::DataObject => "data-object",
            ObjectKind::Collection => "collection",
        }
    }

    /// Type the index files this kind of object under.
    pub fn document_type(self) -> DocumentType {
        match self {
            ObjectKind::DataObject => DocumentType::File,
            ObjectKind::Collection => DocumentType::Folder,
        }
    }

    /// Name of the row query for this kind, used in error context.
    pub fn rows_relation(self) -> &'static str {
        match self {
            ObjectKind::DataObject => "data objects",
            ObjectKind::Collection => "collections",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog object rendered as an index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    /// Lower-cased object UUID
    pub id: String,
    /// JSON document text
    pub document: String,
}

/// Single consistent, read-only view of the catalog.
///
/// A scope can only be given back, never committed. Dropping a scope without
/// calling [`ReadScope::release`] still discards it.
#[async_trait]
pub trait ReadScope: Send {
    /// Build the identifier, permission and metadata relations for every
    /// object whose UUID starts with `prefix` (case-insensitively).
    ///
    /// Returns the number of identifier rows. When that exceeds
    /// `max_in_prefix` the permission and metadata relations are not built and
    /// [`crate::CatalogError::TooManyResults`] carries the count.
    async fn project(&mut self, prefix: &str, max_in_prefix: usize) -> Result<u64>;

    /// Stream the projected documents of one kind. The stream is finite and
    /// can be consumed once.
    fn rows(&mut self, kind: ObjectKind) -> BoxStream<'_, Result<ProjectedRow>>;

    /// Discard the scope and everything built inside it.
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Source of read scopes.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn begin_read_scope(&self) -> Result<Box<dyn ReadScope>>;
}
