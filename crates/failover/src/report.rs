//! Human-readable dry-run report, printed to stdout.

use crate::outcome::{AliasAction, FailoverOutcome, FloatingIpAction};
use common::LogLevel;
use std::fmt;

const RULE_WIDTH: usize = 60;

/// What a live run would do, rendered from a dry-run [`FailoverOutcome`].
pub struct DryRunReport<'a> {
    pub outcome: &'a FailoverOutcome,
    pub log_level: LogLevel,
    pub alias_ips: &'a [String],
}

impl<'a> DryRunReport<'a> {
    pub fn new(outcome: &'a FailoverOutcome, log_level: LogLevel, alias_ips: &'a [String]) -> Self {
        Self {
            outcome,
            log_level,
            alias_ips,
        }
    }

    fn banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{}", rule)?;
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", rule)
    }

    fn floating_ips(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = &self.outcome.floating_ips;
        writeln!(
            f,
            "\nFound {} floating IP(s) matching labels:",
            phase.changes.len()
        )?;

        if phase.changes.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for change in &phase.changes {
            let owner = match change.previous_owner {
                Some(server) => format!("assigned to server {}", server),
                None => "unassigned".to_string(),
            };
            let status = match &change.action {
                FloatingIpAction::AlreadyAssigned => format!("{} ✓ (this server)", owner),
                FloatingIpAction::WouldAssign if change.previous_owner.is_some() => {
                    format!("{} → needs reassignment", owner)
                }
                FloatingIpAction::WouldAssign => format!("{} → needs assignment", owner),
                FloatingIpAction::Assigned => format!("{} → reassigned", owner),
                FloatingIpAction::Failed(e) => format!("{} ✗ {}", owner, e),
            };
            writeln!(f, "  - {} (ID: {}) - {}", change.ip, change.id, status)?;
        }

        if !phase.success {
            if let Some(detail) = &phase.detail {
                writeln!(f, "  ! {}", detail)?;
            }
        }
        Ok(())
    }

    fn alias_ips(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = &self.outcome.alias_ips;
        writeln!(f, "\nConfigured alias IPs: {}", self.alias_ips.len())?;

        if self.alias_ips.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for ip in self.alias_ips {
            writeln!(f, "  - {}", ip)?;
        }

        for change in &phase.changes {
            match &change.action {
                AliasAction::AlreadyConfigured => {
                    writeln!(f, "  network {}: ✓ already configured", change.network)?
                }
                AliasAction::WouldUpdate | AliasAction::Updated => writeln!(
                    f,
                    "  network {}: → needs {}",
                    change.network,
                    change.added.join(", ")
                )?,
                AliasAction::Failed(e) => writeln!(f, "  network {}: ✗ {}", change.network, e)?,
            }
        }
        for problem in phase.ambiguous.iter().chain(&phase.unmatched) {
            writeln!(f, "  ! {}", problem)?;
        }
        if !phase.success {
            if let Some(detail) = &phase.detail {
                writeln!(f, "  ! {}", detail)?;
            }
        }
        Ok(())
    }

    fn summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        Self::banner(f, "Summary:")?;

        let floating = self.outcome.floating_ips.pending();
        let aliases = self.outcome.alias_ips.pending();

        if floating > 0 {
            writeln!(f, "⚠ {} floating IP(s) need to be assigned", floating)?;
        } else if self.outcome.floating_ips.success {
            writeln!(f, "✓ All floating IPs already correctly assigned")?;
        }

        if aliases > 0 {
            writeln!(f, "⚠ {} alias IP(s) need to be added", aliases)?;
        } else if !self.alias_ips.is_empty() && self.outcome.alias_ips.success {
            writeln!(f, "✓ All alias IPs already configured")?;
        }

        if !self.outcome.success() {
            writeln!(f, "✗ Some resources could not be checked, see above")?;
        }
        if floating + aliases > 0 {
            writeln!(f, "Run without --dry-run to execute failover")?;
        }
        Ok(())
    }
}

impl fmt::Display for DryRunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::banner(f, "DRY RUN - Configuration Validation")?;
        writeln!(f, "Server ID: {}", self.outcome.server_id)?;
        writeln!(f, "Log level: {}", self.log_level)?;

        self.floating_ips(f)?;
        self.alias_ips(f)?;
        self.summary(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchError;
    use crate::outcome::{AliasChange, AliasOutcome, FloatingIpChange, FloatingIpOutcome};

    fn outcome() -> FailoverOutcome {
        let mut floating_ips = FloatingIpOutcome::new();
        floating_ips.record(FloatingIpChange {
            id: 1,
            ip: "203.0.113.10".into(),
            previous_owner: Some(12345),
            action: FloatingIpAction::AlreadyAssigned,
        });
        floating_ips.record(FloatingIpChange {
            id: 2,
            ip: "203.0.113.11".into(),
            previous_owner: Some(999),
            action: FloatingIpAction::WouldAssign,
        });
        floating_ips.record(FloatingIpChange {
            id: 3,
            ip: "203.0.113.12".into(),
            previous_owner: None,
            action: FloatingIpAction::WouldAssign,
        });

        let mut alias_ips = AliasOutcome::new();
        alias_ips.record(AliasChange {
            network: 7,
            existing: vec![],
            added: vec!["10.0.0.100/32".into()],
            alias_ips: vec!["10.0.0.100/32".into()],
            action: AliasAction::WouldUpdate,
        });
        alias_ips.unmatched.push(MatchError::NoSubnet {
            address: "192.168.5.5".into(),
        });

        FailoverOutcome {
            server_id: 12345,
            dry_run: true,
            floating_ips,
            alias_ips,
        }
    }

    #[test]
    fn test_report_lists_every_resource() {
        let outcome = outcome();
        let aliases = vec!["10.0.0.100/32".to_string(), "192.168.5.5".to_string()];
        let text = DryRunReport::new(&outcome, LogLevel::Info, &aliases).to_string();

        assert!(text.contains("DRY RUN - Configuration Validation"));
        assert!(text.contains("Server ID: 12345"));
        assert!(text.contains("Log level: INFO"));
        assert!(text.contains("Found 3 floating IP(s) matching labels:"));
        assert!(text.contains("203.0.113.10 (ID: 1) - assigned to server 12345 ✓ (this server)"));
        assert!(text.contains("203.0.113.11 (ID: 2) - assigned to server 999 → needs reassignment"));
        assert!(text.contains("203.0.113.12 (ID: 3) - unassigned → needs assignment"));
        assert!(text.contains("Configured alias IPs: 2"));
        assert!(text.contains("network 7: → needs 10.0.0.100/32"));
        assert!(text.contains("192.168.5.5 does not belong"));
        assert!(text.contains("⚠ 2 floating IP(s) need to be assigned"));
        assert!(text.contains("⚠ 1 alias IP(s) need to be added"));
        assert!(text.contains("Run without --dry-run"));
    }

    #[test]
    fn test_report_when_nothing_to_do() {
        let outcome = FailoverOutcome {
            server_id: 1,
            dry_run: true,
            floating_ips: FloatingIpOutcome::skipped("No floating_ip_labels configured"),
            alias_ips: AliasOutcome::skipped("No alias IPs configured"),
        };
        let text = DryRunReport::new(&outcome, LogLevel::Debug, &[]).to_string();

        assert!(text.contains("Found 0 floating IP(s) matching labels:\n  (none)"));
        assert!(text.contains("Configured alias IPs: 0\n  (none)"));
        assert!(text.contains("✓ All floating IPs already correctly assigned"));
        assert!(!text.contains("Run without --dry-run"));
    }
}
