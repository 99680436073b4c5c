//! Tagprune CLI - deletes stale image tags from an Amazon ECR repository.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod output;
mod prune;

use cli::Cli;
use prune::PruneOptions;
use tagprune_registry::EcrClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let rules = cli.load_rules()?;
    let config = cli.registry_config(|name| std::env::var(name).ok())?;
    let client = EcrClient::new(config).context("Failed to create registry client")?;

    let options = PruneOptions {
        max_pages: client.config().max_pages,
        max_batch_size: client.config().max_batch_size,
        allow_untagged: cli.allow_untagged,
        dry_run: cli.dry_run,
    };
    let outcome = prune::prune(&client, &cli.repository, &rules, options).await?;

    print!("{}", output::render(&outcome, cli.output)?);
    Ok(())
}
