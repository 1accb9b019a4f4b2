use reindex_search_index::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};

/// Limits applied to every reindexing pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// Most catalog rows, and most index documents, a single prefix may hold
    #[serde(default = "default_max_in_prefix")]
    pub max_in_prefix: usize,

    /// Buffered bulk operations that trigger a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Elasticsearch's default `index.max_result_window`; a search cannot page
/// past it in one request.
fn default_max_in_prefix() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            max_in_prefix: default_max_in_prefix(),
            batch_size: default_batch_size(),
        }
    }
}

impl ReindexConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_prefix == 0 {
            return Err("Max in prefix must be > 0".to_string());
        }

        if self.batch_size == 0 {
            return Err("Batch size must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ReindexConfig::default();
        assert_eq!(config.max_in_prefix, 10_000);
        assert_eq!(config.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ReindexConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = 10;
        config.max_in_prefix = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_fields_take_defaults() -> anyhow::Result<()> {
        let config: ReindexConfig = serde_json::from_str(r#"{"batch_size": 50}"#)?;
        assert_eq!(
            config,
            ReindexConfig {
                max_in_prefix: 10_000,
                batch_size: 50,
            }
        );
        Ok(())
    }
}
