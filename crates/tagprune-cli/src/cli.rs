//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use tagprune_core::RuleSet;
use tagprune_registry::{
    AwsCredentials, RegistryAuth, RegistryConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_PAGES,
};

/// Tagprune - delete stale image tags from an ECR repository
#[derive(Debug, Parser)]
#[command(name = "tagprune")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AWS region of the registry (e.g. us-east-1)
    pub region: String,

    /// Repository to prune
    pub repository: String,

    /// Rule file (YAML, or JSON with a .json extension); defaults to the built-in rules
    #[arg(long, env = "TAGPRUNE_RULES")]
    pub rules: Option<PathBuf>,

    /// Registry endpoint override (e.g. `<http://localhost:4566>`)
    #[arg(long, env = "TAGPRUNE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Registry (account) ID, if not the caller's default registry
    #[arg(long, env = "TAGPRUNE_REGISTRY_ID")]
    pub registry_id: Option<String>,

    /// Bearer token for authentication
    #[arg(long, env = "TAGPRUNE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for basic authentication
    #[arg(short, long, env = "TAGPRUNE_USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "TAGPRUNE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Send unsigned requests instead of AWS SigV4
    #[arg(long)]
    pub no_sign: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Images requested per listing page (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_size: Option<u32>,

    /// Give up after this many listing pages
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Digests per delete request
    #[arg(long, default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Treat images without a tag list as untagged instead of failing
    #[arg(long)]
    pub allow_untagged: bool,

    /// Print what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Pretty-printed JSON
    Json,
}

impl Cli {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "tagprune=debug"
        } else {
            "tagprune=info"
        }
    }

    /// Builds the registry configuration, reading AWS credentials through `env`.
    pub fn registry_config(&self, env: impl Fn(&str) -> Option<String>) -> Result<RegistryConfig> {
        let mut config = RegistryConfig::new(&self.region)
            .with_auth(determine_auth(self, env)?)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_pages(self.max_pages)
            .with_max_batch_size(self.max_batch_size);

        if let Some(ref endpoint) = self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let Some(ref registry_id) = self.registry_id {
            config = config.with_registry_id(registry_id);
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }

        Ok(config)
    }

    /// Loads the rule file, or the built-in rules if none was given.
    pub fn load_rules(&self) -> Result<RuleSet> {
        match self.rules {
            Some(ref path) => RuleSet::from_file(path)
                .with_context(|| format!("Failed to load rules from {}", path.display())),
            None => RuleSet::builtin().context("Failed to build the default rules"),
        }
    }
}

/// Determines the authentication method from CLI arguments.
///
/// Token beats basic credentials; without either, requests are signed with
/// AWS credentials from the environment unless `--no-sign` is set.
fn determine_auth(args: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<RegistryAuth> {
    if let Some(ref token) = args.token {
        return Ok(RegistryAuth::bearer(token));
    }

    if let (Some(ref username), Some(ref password)) = (&args.username, &args.password) {
        return Ok(RegistryAuth::basic(username, password));
    }

    if args.username.is_some() || args.password.is_some() {
        anyhow::bail!("Both --username and --password are required for basic authentication");
    }

    if args.no_sign {
        return Ok(RegistryAuth::None);
    }

    let credentials = AwsCredentials::from_lookup(env)
        .context("AWS credentials are required unless --no-sign, --token or --username is given")?;
    Ok(RegistryAuth::aws(credentials))
}
