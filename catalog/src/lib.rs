//! # Catalog access for reindexing
//!
//! A [`Catalog`] hands out [`ReadScope`]s: consistent, never-committed views in
//! which the objects under one UUID prefix are projected into index documents.
//! [`PostgresCatalog`] reads the iRODS ICAT schema; [`MemCatalog`] keeps
//! objects in memory.

mod error;
pub mod mem;
mod postgres;
pub mod projection;
mod scope;

pub use error::{CatalogError, Result};
pub use mem::MemCatalog;
pub use postgres::{PostgresCatalog, PostgresConfig};
pub use scope::{Catalog, ObjectKind, ProjectedRow, ReadScope};
