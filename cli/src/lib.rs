pub mod config;
pub mod driver;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use driver::{DriverReport, PrefixDriver};
use owo_colors::OwoColorize;
use reindex_catalog::PostgresCatalog;
use reindex_core::Reindexer;
use reindex_search_index::ElasticsearchIndex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Reconcile the Elasticsearch index with the iRODS catalog
#[derive(Debug, Parser)]
#[command(name = "catalog-reindex", version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "PATH", env = "CATALOG_REINDEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix to reindex (repeatable; overrides the configured prefixes)
    #[arg(short, long = "prefix", value_name = "PREFIX")]
    pub prefixes: Vec<String>,

    /// Most objects a single prefix may hold in either store
    #[arg(long, value_name = "N")]
    pub max_in_prefix: Option<usize>,

    /// Bulk operations sent per request
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
}

impl Cli {
    /// Configuration file contents with the command-line overrides applied.
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if !self.prefixes.is_empty() {
            config.driver.prefixes = self.prefixes.clone();
        }
        if let Some(max_in_prefix) = self.max_in_prefix {
            config.reindex.max_in_prefix = max_in_prefix;
        }
        if let Some(batch_size) = self.batch_size {
            config.reindex.batch_size = batch_size;
        }
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }

    pub async fn run(self) -> Result<DriverReport> {
        let config = self.load_config()?;

        let catalog = PostgresCatalog::connect(&config.catalog)
            .await
            .context("Failed to connect to the catalog database")?;
        let index = ElasticsearchIndex::connect(&config.elasticsearch)
            .await
            .context("Failed to connect to Elasticsearch")?;
        info!(
            "Reindexing {} prefixes into index {}",
            config.driver.prefixes.len(),
            index.index_name()
        );

        let reindexer = Reindexer::new(Arc::new(catalog), Arc::new(index), config.reindex.clone())
            .context("Failed to initialize reindexer")?;
        let report = PrefixDriver::new(&reindexer, &config.driver)
            .run(&config.driver.prefixes)
            .await;
        Ok(report)
    }
}

/// Print the totals of a run to stdout.
pub fn print_report(report: &DriverReport) {
    let totals = &report.totals;
    let d = &totals.data_objects;
    let c = &totals.collections;

    if report.is_success() {
        println!("{} Reindexing complete!", "✓".bright_green());
    } else {
        println!("{} Reindexing finished with errors", "✗".bright_red());
    }
    println!("  Passes: {}", report.passes.bright_cyan());
    println!("  Prefixes split: {}", report.subdivided.bright_cyan());
    println!("  Objects processed: {}", totals.processed.bright_cyan());
    println!(
        "  Data objects: {} added, {} updated, {} removed",
        d.added.bright_cyan(),
        d.updated.bright_cyan(),
        d.removed.bright_cyan()
    );
    println!(
        "  Collections: {} added, {} updated, {} removed",
        c.added.bright_cyan(),
        c.updated.bright_cyan(),
        c.removed.bright_cyan()
    );
    println!("  Time in passes: {:?}", totals.elapsed);

    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            "✗".bright_red(),
            failure.prefix.bright_yellow(),
            failure.error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_override_the_file() -> Result<()> {
        let cli = Cli::try_parse_from([
            "catalog-reindex",
            "--prefix",
            "0a",
            "-p",
            "0b",
            "--max-in-prefix",
            "500",
        ])?;
        let config = cli.load_config()?;
        assert_eq!(config.driver.prefixes, vec!["0a", "0b"]);
        assert_eq!(config.reindex.max_in_prefix, 500);
        assert_eq!(config.reindex.batch_size, 1000);
        Ok(())
    }

    #[test]
    fn invalid_overrides_are_rejected() -> Result<()> {
        let cli = Cli::try_parse_from(["catalog-reindex", "--batch-size", "0"])?;
        assert!(cli.load_config().is_err());
        Ok(())
    }
}
