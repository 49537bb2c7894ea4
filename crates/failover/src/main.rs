//! hetzner-vrrp-failover binary

use clap::Parser;
use hetzner_vrrp_failover::Cli;
use hetzner_vrrp_failover::cli;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    // Nothing is rolled back on interrupt; calls already accepted stand
    let code = cli::run_until_interrupted(cli::run(args), tokio::signal::ctrl_c()).await;

    ExitCode::from(code)
}
