use clap::Parser;
use reindex_cli::Cli;
use reindex_cli::print_report;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let report = Cli::parse().run().await?;
    print_report(&report);

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
