use crate::document::DocumentType;
use crate::error::Result;
use crate::error::SearchIndexError;
use crate::index::BulkOperation;
use crate::index::SearchHit;
use crate::index::SearchHits;
use crate::index::SearchIndex;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use tracing::info;

const NDJSON: &str = "application/x-ndjson";

/// Connection settings for an Elasticsearch cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`
    pub base_url: String,

    /// Basic-auth user
    #[serde(default)]
    pub user: Option<String>,

    /// Basic-auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Index holding the file and folder documents
    pub index: String,

    /// How long to wait for the cluster to report yellow or better
    #[serde(default = "default_health_wait_secs")]
    pub health_wait_secs: u64,

    /// Timeout for search and bulk requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_health_wait_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            user: None,
            password: None,
            index: "data".to_string(),
            health_wait_secs: default_health_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// [`SearchIndex`] backed by an Elasticsearch cluster over HTTP.
#[derive(Debug, Clone)]
pub struct ElasticsearchIndex {
    http: reqwest::Client,
    base_url: String,
    index: String,
    user: Option<String>,
    password: Option<String>,
}

impl ElasticsearchIndex {
    /// Build a client without contacting the cluster.
    pub fn new(config: &ElasticsearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SearchIndexError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// Build a client and wait for the cluster to become usable.
    pub async fn connect(config: &ElasticsearchConfig) -> Result<Self> {
        let es = Self::new(config)?;
        es.wait_for_yellow(Duration::from_secs(config.health_wait_secs))
            .await?;
        info!(index = %es.index, "connected to search index at {}", es.base_url);
        Ok(es)
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Block until cluster health is yellow or green, or `wait` elapses.
    pub async fn wait_for_yellow(&self, wait: Duration) -> Result<()> {
        let secs = wait.as_secs().max(1);
        let resp = self
            .request(Method::GET, "_cluster/health")
            .query(&[
                ("wait_for_status", "yellow".to_string()),
                ("timeout", format!("{secs}s")),
            ])
            .timeout(wait + Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| SearchIndexError::Connection(e.to_string()))?;

        // A timed out wait is reported as 408 with the health body.
        let status = resp.status();
        if !status.is_success() && status != StatusCode::REQUEST_TIMEOUT {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchIndexError::Connection(format!("{status} - {body}")));
        }
        let health: ClusterHealth = resp
            .json()
            .await
            .map_err(|e| SearchIndexError::Connection(format!("unreadable cluster health: {e}")))?;
        if health.timed_out || !matches!(health.status.as_str(), "yellow" | "green") {
            return Err(SearchIndexError::Unhealthy { wait_secs: secs });
        }
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}/{path}", self.base_url));
        match &self.user {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    fn encode_bulk(&self, operations: &[BulkOperation]) -> Result<String> {
        let mut body = String::new();
        for op in operations {
            match op {
                BulkOperation::Index {
                    doc_type,
                    id,
                    source,
                } => {
                    let action = BulkAction::Index(self.action_meta(*doc_type, id));
                    body.push_str(&serde_json::to_string(&action)?);
                    body.push('\n');
                    // NDJSON framing needs the source on a single line.
                    if source.contains('\n') {
                        let value: serde_json::Value = serde_json::from_str(source)?;
                        body.push_str(&serde_json::to_string(&value)?);
                    } else {
                        body.push_str(source);
                    }
                    body.push('\n');
                }
                BulkOperation::Delete { doc_type, id } => {
                    let action = BulkAction::Delete(self.action_meta(*doc_type, id));
                    body.push_str(&serde_json::to_string(&action)?);
                    body.push('\n');
                }
            }
        }
        Ok(body)
    }

    fn action_meta<'a>(&'a self, doc_type: DocumentType, id: &'a str) -> ActionMeta<'a> {
        ActionMeta {
            index: &self.index,
            doc_type: doc_type.as_str(),
            id,
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn search_prefix(&self, prefix: &str, limit: usize) -> Result<SearchHits> {
        let types = DocumentType::ALL.map(DocumentType::as_str).join(",");
        let body = json!({
            "query": {
                "bool": {
                    "should": [
                        {"prefix": {"id": prefix.to_uppercase()}},
                        {"prefix": {"id": prefix.to_lowercase()}},
                    ],
                    "minimum_should_match": 1,
                }
            },
            "sort": [{"id": {"order": "asc"}}],
            "size": limit,
        });

        let resp = self
            .request(Method::POST, &format!("{}/{types}/_search", self.index))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchIndexError::SearchFailed(format!("{status} - {body}")));
        }

        let parsed: SearchResponse = resp.json().await?;
        let total = parsed.hits.total.value();
        debug!("Search for prefix {prefix} matched {total} documents");
        Ok(SearchHits {
            total,
            hits: parsed
                .hits
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    id: hit.id,
                    doc_type: hit.doc_type,
                    source: hit.source,
                })
                .collect(),
        })
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }
        let body = self.encode_bulk(operations)?;
        let resp = self
            .request(Method::POST, "_bulk")
            .header(CONTENT_TYPE, NDJSON)
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchIndexError::BulkFailed(format!("{status} - {body}")));
        }

        let parsed: BulkResponse = resp.json().await?;
        if parsed.errors {
            let failed = parsed
                .items
                .iter()
                .flat_map(|item| item.iter())
                .find(|(_, result)| result.error.is_some());
            let detail = match failed {
                Some((action, result)) => format!(
                    "{action} of {} failed with status {}: {}",
                    result.id,
                    result.status,
                    result.error.as_ref().map(ToString::to_string).unwrap_or_default()
                ),
                None => "index reported errors without item details".to_string(),
            };
            return Err(SearchIndexError::BulkFailed(detail));
        }
        debug!("Flushed {} bulk operations", operations.len());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum BulkAction<'a> {
    Index(ActionMeta<'a>),
    Delete(ActionMeta<'a>),
}

#[derive(Debug, Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterHealth {
    #[serde(default)]
    status: String,
    #[serde(default)]
    timed_out: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total` is a bare number before Elasticsearch 7 and an object after.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) | TotalHits::Object { value: n } => *n,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_type", default)]
    doc_type: Option<String>,
    #[serde(rename = "_source", default)]
    source: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItemResult>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<serde_json::Value>,
}
