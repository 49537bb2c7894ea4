//! Command-line entry point.

use crate::config::{Config, DEFAULT_CONFIG_PATH, SubnetMatching};
use crate::engine::FailoverEngine;
use crate::outcome::FailoverOutcome;
use crate::report::DryRunReport;
use clap::Parser;
use hcloud::{FixedIdentity, HcloudClient, IdentityResolver, MetadataService, ServerId};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INTERRUPTED: u8 = 130;

/// Usage error printed when `--fake-server-id` is given without `--dry-run`
pub const FAKE_SERVER_ID_REQUIRES_DRY_RUN: &str =
    "--fake-server-id can only be used with --dry-run";

const EXAMPLES: &str = "\
Examples:
  # Execute failover with default config
  hetzner-vrrp-failover

  # Execute failover with custom config
  hetzner-vrrp-failover -c /etc/hetzner/config.yaml

  # Dry run mode (check configuration only)
  hetzner-vrrp-failover --dry-run

  # Dry run with fake server ID (test without Hetzner server)
  hetzner-vrrp-failover --dry-run --fake-server-id 12345";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hetzner-vrrp-failover",
    version,
    about = "Hetzner Cloud VRRP Failover Script",
    after_help = EXAMPLES
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Validate configuration without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Fake server ID for testing (only works with --dry-run)
    #[arg(long, value_name = "ID")]
    pub fake_server_id: Option<ServerId>,
}

impl Cli {
    /// Reject flag combinations clap cannot express
    pub fn check(&self) -> Result<(), &'static str> {
        if self.fake_server_id.is_some() && !self.dry_run {
            return Err(FAKE_SERVER_ID_REQUIRES_DRY_RUN);
        }
        Ok(())
    }
}

/// Drive `run` to completion unless `interrupt` resolves first.
///
/// An interrupt source that fails to install is ignored.
pub async fn run_until_interrupted<R, I>(run: R, interrupt: I) -> u8
where
    R: Future<Output = u8>,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        code = run => code,
        Ok(()) = interrupt => {
            eprintln!("\nInterrupted by user");
            EXIT_INTERRUPTED
        }
    }
}

/// Run one failover pass and return the process exit code.
pub async fn run(cli: Cli) -> u8 {
    if let Err(usage) = cli.check() {
        eprintln!("Error: {}", usage);
        return EXIT_FAILURE;
    }

    let config = match Config::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };

    // Only fails when a subscriber is already installed
    if let Err(e) = common::logging::init(&config.logging_options()) {
        eprintln!("Warning: {}", e);
    }
    info!(path = %cli.config.display(), "Configuration loaded");
    if let Ok(summary) = serde_json::to_string(&config.summary()) {
        debug!(config = %summary, "Effective configuration");
    }

    match execute(&config, &cli).await {
        Ok(outcome) => {
            if cli.dry_run {
                print!(
                    "{}",
                    DryRunReport::new(&outcome, config.log_level(), &config.alias_ips)
                );
            }
            if outcome.success() {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

async fn execute(config: &Config, cli: &Cli) -> common::Result<FailoverOutcome> {
    let client = HcloudClient::with_endpoint(
        config.api_token(),
        &config.api.endpoint,
        config.api.timeout,
    )?
    .with_subnet_ranges(config.subnet_matching == SubnetMatching::Cidr);

    let identity: Box<dyn IdentityResolver> = match cli.fake_server_id {
        Some(id) => {
            println!("Using fake server ID: {}", id);
            Box::new(FixedIdentity::new(id))
        }
        None => Box::new(MetadataService::with_base_url(
            &config.metadata.endpoint,
            config.metadata.timeout,
        )?),
    };

    let engine = FailoverEngine::connect(
        Arc::new(client),
        identity.as_ref(),
        config.failover_settings(cli.dry_run),
    )
    .await?
    .with_matcher(config.matcher());

    Ok(engine.execute_failover().await)
}
