//! Per-resource results of a failover run.

use crate::matcher::MatchError;
use hcloud::{FloatingIpId, NetworkId, ServerId};

/// What happened to one floating IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloatingIpAction {
    /// Already owned by this server; no call made
    AlreadyAssigned,
    /// Reassigned to this server
    Assigned,
    /// Would be reassigned (dry run)
    WouldAssign,
    /// Reassignment failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingIpChange {
    pub id: FloatingIpId,
    pub ip: String,

    /// Owner before this run, if any
    pub previous_owner: Option<ServerId>,

    pub action: FloatingIpAction,
}

/// What happened to the alias list of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    /// Every declared alias was already present; no call made
    AlreadyConfigured,
    /// Alias list replaced with the merged set
    Updated,
    /// Alias list would be replaced (dry run)
    WouldUpdate,
    /// Replacing the alias list failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasChange {
    pub network: NetworkId,

    /// Aliases present before this run
    pub existing: Vec<String>,

    /// Aliases this run adds (or would add)
    pub added: Vec<String>,

    /// Full list written back (or that would be written back)
    pub alias_ips: Vec<String>,

    pub action: AliasAction,
}

/// Result of the floating IP phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingIpOutcome {
    pub success: bool,
    pub changes: Vec<FloatingIpChange>,

    /// Phase-level note, e.g. why nothing was attempted
    pub detail: Option<String>,
}

impl FloatingIpOutcome {
    pub(crate) fn new() -> Self {
        Self {
            success: true,
            changes: Vec::new(),
            detail: None,
        }
    }

    pub(crate) fn skipped(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new()
        }
    }

    pub(crate) fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            changes: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    pub(crate) fn record(&mut self, change: FloatingIpChange) {
        if matches!(change.action, FloatingIpAction::Failed(_)) {
            self.success = false;
        }
        self.changes.push(change);
    }

    /// Reassignments a live run would still have to make.
    pub fn pending(&self) -> usize {
        self.count(|a| matches!(a, FloatingIpAction::WouldAssign))
    }

    pub fn failures(&self) -> usize {
        self.count(|a| matches!(a, FloatingIpAction::Failed(_)))
    }

    fn count(&self, f: impl Fn(&FloatingIpAction) -> bool) -> usize {
        self.changes.iter().filter(|c| f(&c.action)).count()
    }
}

/// Result of the alias IP phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasOutcome {
    pub success: bool,
    pub changes: Vec<AliasChange>,

    /// Declared addresses that were excluded
    pub unmatched: Vec<MatchError>,

    /// Declared addresses that matched several networks
    pub ambiguous: Vec<MatchError>,

    pub detail: Option<String>,
}

impl AliasOutcome {
    pub(crate) fn new() -> Self {
        Self {
            success: true,
            changes: Vec::new(),
            unmatched: Vec::new(),
            ambiguous: Vec::new(),
            detail: None,
        }
    }

    pub(crate) fn skipped(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new()
        }
    }

    pub(crate) fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: Some(detail.into()),
            ..Self::new()
        }
    }

    pub(crate) fn record(&mut self, change: AliasChange) {
        if matches!(change.action, AliasAction::Failed(_)) {
            self.success = false;
        }
        self.changes.push(change);
    }

    /// Alias addresses a live run would still have to add.
    pub fn pending(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.action == AliasAction::WouldUpdate)
            .map(|c| c.added.len())
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c.action, AliasAction::Failed(_)))
            .count()
    }
}

/// Result of a complete failover run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverOutcome {
    pub server_id: ServerId,
    pub dry_run: bool,
    pub floating_ips: FloatingIpOutcome,
    pub alias_ips: AliasOutcome,
}

impl FailoverOutcome {
    pub fn success(&self) -> bool {
        self.floating_ips.success && self.alias_ips.success
    }

    pub fn pending_changes(&self) -> usize {
        self.floating_ips.pending() + self.alias_ips.pending()
    }
}
