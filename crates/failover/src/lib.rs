//! Hetzner Cloud VRRP failover
//!
//! Invoked by keepalived when this node becomes VRRP MASTER. Makes the Cloud
//! API agree with the election result by pulling the shared addresses onto
//! this server.
//!
//! # Components
//!
//! - **Config**: YAML configuration and its validation
//! - **Matcher**: routes declared alias addresses to private networks
//! - **Engine**: the reconciliation pass (floating IPs, then alias IPs)
//! - **Outcome**: per-resource results of a pass
//! - **Report**: dry-run report for operators
//! - **CLI**: argument parsing and exit codes

pub mod cli;
pub mod config;
pub mod engine;
pub mod matcher;
pub mod outcome;
pub mod report;

pub use cli::Cli;
pub use config::{Config, ConfigError, SubnetMatching};
pub use engine::{FailoverEngine, FailoverSettings};
pub use matcher::{CidrMatcher, MatchError, PrefixMatcher, SubnetMatcher};
pub use outcome::{AliasAction, AliasOutcome, FailoverOutcome, FloatingIpAction, FloatingIpOutcome};
pub use report::DryRunReport;
