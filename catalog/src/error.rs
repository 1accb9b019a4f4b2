use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Too many results in prefix: {count} rows")]
    TooManyResults { count: u64 },

    #[error("Failed to connect to catalog: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to open catalog read scope: {0}")]
    BeginScope(#[source] sqlx::Error),

    #[error("Failed to release catalog read scope: {0}")]
    Release(#[source] sqlx::Error),

    #[error("Catalog query for {relation} failed: {source}")]
    Query {
        relation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Catalog rows requested before the prefix was projected")]
    NotProjected,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
