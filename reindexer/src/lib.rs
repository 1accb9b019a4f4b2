/*!
# Catalog Reindexer

Reconciles a search index with the iRODS catalog, one UUID prefix at a time.

## Features

- **Bounded passes**: a prefix holding more than `max_in_prefix` objects in
  either store is refused, so the caller can split it and retry
- **Minimal writes**: only new or changed documents are indexed, and only
  documents the catalog no longer has are deleted
- **Order-insensitive comparison** of metadata and permissions
- **Consistent reads**: each pass reads the catalog from a single snapshot
  that is always rolled back

## Example

```rust,no_run
use reindex_catalog::{PostgresCatalog, PostgresConfig};
use reindex_core::{ReindexConfig, Reindexer};
use reindex_search_index::{ElasticsearchConfig, ElasticsearchIndex};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let catalog = PostgresCatalog::connect(&PostgresConfig {
        uri: "postgres://irods@localhost/ICAT".to_string(),
        ..Default::default()
    })
    .await?;
    let index = ElasticsearchIndex::connect(&ElasticsearchConfig::default()).await?;

    let reindexer = Reindexer::new(Arc::new(catalog), Arc::new(index), ReindexConfig::default())?;
    match reindexer.reindex_prefix("0a").await {
        Ok(stats) => println!("{stats}"),
        Err(err) if err.too_many_results().is_some() => println!("split 0a and retry"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
```
*/

mod classify;
mod config;
mod error;
mod reindexer;
mod stats;

pub use classify::{Classification, classify};
pub use config::ReindexConfig;
pub use error::{BulkPhase, CardinalitySide, ReindexError, Result};
pub use reindexer::{
    MAX_PREFIX_LEN, PassPhase, PassProgress, ProgressCallback, Reindexer, validate_prefix,
};
pub use stats::{KindStats, PassStats};
