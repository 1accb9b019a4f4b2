//! Catalog reads against the iRODS ICAT Postgres database.

use crate::error::CatalogError;
use crate::error::Result;
use crate::projection::Relation;
use crate::projection::row_query;
use crate::scope::Catalog;
use crate::scope::ObjectKind;
use crate::scope::ProjectedRow;
use crate::scope::ReadScope;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use tracing::info;

/// Connection settings for the catalog database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Connection URI, e.g. `postgres://irods@localhost/ICAT`
    pub uri: String,

    /// Maximum pooled connections. Each running pass holds one.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a connection
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    4
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            uri: "postgres://localhost/ICAT".to_string(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// [`Catalog`] backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.uri).map_err(CatalogError::Connect)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(CatalogError::Connect)?;
        info!("connected to catalog");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn begin_read_scope(&self) -> Result<Box<dyn ReadScope>> {
        let mut tx = self.pool.begin().await.map_err(CatalogError::BeginScope)?;
        // Every query in the scope sees the same snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(CatalogError::BeginScope)?;
        Ok(Box::new(PostgresReadScope {
            tx,
            projected: false,
        }))
    }
}

/// A repeatable-read transaction that is always rolled back.
struct PostgresReadScope {
    tx: Transaction<'static, Postgres>,
    projected: bool,
}

impl PostgresReadScope {
    async fn build(&mut self, relation: Relation, prefix: &str) -> Result<u64> {
        let mut rows = 0;
        for &sql in relation.statements() {
            let mut query = sqlx::query(sql);
            if sql.contains("$1") {
                query = query.bind(prefix);
            }
            rows = query
                .execute(&mut *self.tx)
                .await
                .map_err(|source| CatalogError::Query {
                    relation: relation.name(),
                    source,
                })?
                .rows_affected();
        }
        Ok(rows)
    }
}

#[async_trait]
impl ReadScope for PostgresReadScope {
    async fn project(&mut self, prefix: &str, max_in_prefix: usize) -> Result<u64> {
        let count = self.build(Relation::BaseObjectUuids, prefix).await?;
        if count > max_in_prefix as u64 {
            return Err(CatalogError::TooManyResults { count });
        }
        debug!(
            "Got {count} rows for prefix {prefix} (note that this may include stale unused metadata)"
        );

        for relation in [Relation::ObjectUuids, Relation::ObjectPerms, Relation::ObjectMetadata] {
            let rows = self.build(relation, prefix).await?;
            debug!("Got {rows} rows for {}", relation.name());
        }
        self.projected = true;
        Ok(count)
    }

    fn rows(&mut self, kind: ObjectKind) -> BoxStream<'_, Result<ProjectedRow>> {
        if !self.projected {
            return stream::once(async { Err(CatalogError::NotProjected) }).boxed();
        }
        let relation = kind.rows_relation();
        sqlx::query_as::<_, (String, String)>(row_query(kind))
            .fetch(&mut *self.tx)
            .map(move |row| {
                row.map(|(id, document)| ProjectedRow { id, document })
                    .map_err(|source| CatalogError::Query { relation, source })
            })
            .boxed()
    }

    async fn release(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(CatalogError::Release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn connect() -> anyhow::Result<PostgresCatalog> {
        let uri = std::env::var("TEST_CATALOG_DSN")?;
        Ok(PostgresCatalog::connect(&PostgresConfig {
            uri,
            ..Default::default()
        })
        .await?)
    }

    #[tokio::test]
    #[ignore] // Requires a catalog database in TEST_CATALOG_DSN
    async fn projects_and_streams_rows() -> anyhow::Result<()> {
        let catalog = connect().await?;
        let mut scope = catalog.begin_read_scope().await?;

        let count = scope.project("0", usize::MAX).await?;
        let files: Vec<_> = scope.rows(ObjectKind::DataObject).try_collect().await?;
        let folders: Vec<_> = scope.rows(ObjectKind::Collection).try_collect().await?;
        scope.release().await?;

        assert!(files.len() + folders.len() <= count as usize);
        for row in files.iter().chain(folders.iter()) {
            assert!(row.id.starts_with('0'));
            let doc: serde_json::Value = serde_json::from_str(&row.document)?;
            assert_eq!(doc["id"], serde_json::Value::String(row.id.clone()));
        }
        Ok(())
    }

    #[tokio::test]
    #[ignore] // Requires a catalog database in TEST_CATALOG_DSN
    async fn cap_is_enforced_on_identifier_rows() -> anyhow::Result<()> {
        let catalog = connect().await?;
        let mut scope = catalog.begin_read_scope().await?;
        let result = scope.project("", 0).await;
        scope.release().await?;
        match result {
            Err(CatalogError::TooManyResults { count }) => assert!(count > 0),
            Ok(0) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }
}
