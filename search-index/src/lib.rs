//! # Search index access for catalog reindexing
//!
//! This crate holds everything a reconciliation pass needs from the search
//! index side:
//!
//! - The document shape shared by the catalog projection and the index, with
//!   order-insensitive equality over metadata and permissions
//! - The [`SearchIndex`] trait, with an Elasticsearch implementation over HTTP
//!   and an in-memory one
//! - [`IndexSnapshot`], a capped point-in-time read of one id prefix
//! - [`BulkIndexer`], which batches index and delete operations
//!
//! ## Example
//!
//! ```no_run
//! use reindex_search_index::{ElasticsearchConfig, ElasticsearchIndex, IndexSnapshot};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ElasticsearchConfig {
//!         base_url: "http://localhost:9200".to_string(),
//!         index: "data".to_string(),
//!         ..Default::default()
//!     };
//!     let es = ElasticsearchIndex::connect(&config).await?;
//!
//!     let snapshot = IndexSnapshot::load(&es, "0a1b", 10_000).await?;
//!     println!("{} documents under prefix 0a1b", snapshot.len());
//!     Ok(())
//! }
//! ```

mod bulk;
mod document;
mod elasticsearch;
mod error;
mod index;
pub mod mem;
mod snapshot;

pub use bulk::{BulkIndexer, DEFAULT_BATCH_SIZE};
pub use document::{DocumentType, IndexedDocument, Metadatum, Permission, UserPermission};
pub use elasticsearch::{ElasticsearchConfig, ElasticsearchIndex};
pub use error::{Result, SearchIndexError};
pub use index::{BulkOperation, SearchHit, SearchHits, SearchIndex};
pub use mem::MemIndex;
pub use snapshot::IndexSnapshot;
