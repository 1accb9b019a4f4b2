use thiserror::Error;

/// Errors that can occur while talking to the search index
#[derive(Debug, Error)]
pub enum SearchIndexError {
    /// More documents match the prefix than a single pass may hold
    #[error("Too many results in prefix: {count} documents")]
    TooManyResults { count: u64 },

    /// Failed to build the HTTP client or reach the cluster
    #[error("Failed to connect to search index: {0}")]
    Connection(String),

    /// The cluster did not become healthy in time
    #[error("Cluster did not report yellow or better status within {wait_secs}s")]
    Unhealthy { wait_secs: u64 },

    /// A search request was rejected or failed in transit
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// A bulk request was rejected, or one of its items failed
    #[error("Bulk request failed: {0}")]
    BulkFailed(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchIndexError>;
