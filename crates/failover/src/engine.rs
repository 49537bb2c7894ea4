//! Reconciliation engine.
//!
//! One failover run is a single sequential pass:
//!
//! 1. floating IP phase: claim every floating IP matching the configured
//!    labels that this server does not own yet
//! 2. alias IP phase: add the declared alias addresses to the alias list of
//!    the private network each one belongs to
//!
//! Every provider call is independent. A failing call is logged, recorded
//! in the phase outcome and never stops the remaining calls or the other
//! phase. Running twice without drift makes no mutating call the second
//! time.

use crate::matcher::{PrefixMatcher, SubnetMatcher, merge_aliases, plan_aliases};
use crate::outcome::{
    AliasAction, AliasChange, AliasOutcome, FailoverOutcome, FloatingIpAction, FloatingIpChange,
    FloatingIpOutcome,
};
use hcloud::{CloudApi, FloatingIp, IdentityResolver, LabelSelector, ServerId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reported when alias IPs are declared but the server has no private network.
pub const NO_PRIVATE_NETWORKS: &str =
    "No private networks attached to server - alias IPs require a private network";

/// Reported when no declared alias address fits any attached network.
pub const NO_MATCHED_ALIASES: &str = "No alias IPs could be matched to server's private networks";

/// What the engine should make true for this server.
#[derive(Debug, Clone, Default)]
pub struct FailoverSettings {
    /// Floating IPs carrying all of these labels belong to the VIP set
    pub floating_ip_labels: LabelSelector,

    /// Alias addresses to attach to the server's private networks
    pub alias_ips: Vec<String>,

    /// Report instead of mutating
    pub dry_run: bool,
}

/// Applies [`FailoverSettings`] to one server.
pub struct FailoverEngine {
    cloud: Arc<dyn CloudApi>,
    matcher: Box<dyn SubnetMatcher>,
    server_id: ServerId,
    settings: FailoverSettings,
}

impl FailoverEngine {
    /// Create an engine for a known server
    pub fn new(cloud: Arc<dyn CloudApi>, server_id: ServerId, settings: FailoverSettings) -> Self {
        Self {
            cloud,
            matcher: Box::new(PrefixMatcher),
            server_id,
            settings,
        }
    }

    /// Resolve this node's identity and create an engine for it.
    ///
    /// Identity resolution failure is fatal: nothing is attempted without it.
    pub async fn connect(
        cloud: Arc<dyn CloudApi>,
        identity: &dyn IdentityResolver,
        settings: FailoverSettings,
    ) -> common::Result<Self> {
        let server_id = identity.server_id().await?;

        match identity.hostname().await {
            Some(hostname) => info!(server_id, hostname = %hostname, "Initialized for server"),
            None => info!(server_id, "Initialized for server"),
        }
        if settings.dry_run {
            info!("DRY RUN MODE - No changes will be made");
        }

        Ok(Self::new(cloud, server_id, settings))
    }

    /// Replace the default [`PrefixMatcher`]
    pub fn with_matcher(mut self, matcher: Box<dyn SubnetMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn server_id(&self) -> ServerId {
        self.server_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.settings.dry_run
    }

    fn tag(&self) -> &'static str {
        if self.settings.dry_run { "[DRY RUN] " } else { "" }
    }

    /// Run both phases and combine their outcomes.
    pub async fn execute_failover(&self) -> FailoverOutcome {
        let dry_run = self.settings.dry_run;
        info!(
            server_id = self.server_id,
            dry_run,
            matcher = self.matcher.name(),
            "{}Starting VRRP failover process",
            self.tag()
        );

        let floating_ips = self.reconcile_floating_ips().await;
        let alias_ips = self.reconcile_alias_ips().await;

        let outcome = FailoverOutcome {
            server_id: self.server_id,
            dry_run,
            floating_ips,
            alias_ips,
        };

        if outcome.success() {
            if dry_run {
                info!(
                    server_id = self.server_id,
                    dry_run,
                    pending = outcome.pending_changes(),
                    "[DRY RUN] Failover dry run completed successfully (no changes made)"
                );
            } else {
                info!(
                    server_id = self.server_id,
                    dry_run, "Failover completed successfully"
                );
            }
        } else {
            error!(
                server_id = self.server_id,
                dry_run,
                floating_ip_failures = outcome.floating_ips.failures(),
                alias_ip_failures = outcome.alias_ips.failures(),
                "{}Failover completed with errors",
                self.tag()
            );
        }

        outcome
    }

    /// Claim every floating IP matching the configured labels.
    pub async fn reconcile_floating_ips(&self) -> FloatingIpOutcome {
        let selector = &self.settings.floating_ip_labels;
        let tag = self.tag();

        if selector.is_empty() {
            warn!("{}No floating_ip_labels configured", tag);
            return FloatingIpOutcome::skipped("No floating_ip_labels configured");
        }

        info!(labels = %selector, "{}Fetching floating IPs", tag);
        let floating_ips = match self.cloud.floating_ips(selector).await {
            Ok(fips) => fips,
            Err(e) => {
                error!(labels = %selector, error = %e, "{}Failed to get floating IPs", tag);
                return FloatingIpOutcome::failed(format!("Failed to get floating IPs: {}", e));
            }
        };
        info!(
            count = floating_ips.len(),
            "{}Found floating IPs matching labels", tag
        );

        if floating_ips.is_empty() {
            warn!("{}No floating IPs found to assign", tag);
            return FloatingIpOutcome::skipped("No floating IPs matched the configured labels");
        }

        let mut outcome = FloatingIpOutcome::new();
        for fip in &floating_ips {
            let action = self.reconcile_floating_ip(fip).await;
            outcome.record(FloatingIpChange {
                id: fip.id,
                ip: fip.ip.clone(),
                previous_owner: fip.server,
                action,
            });
        }

        outcome
    }

    async fn reconcile_floating_ip(&self, fip: &FloatingIp) -> FloatingIpAction {
        let tag = self.tag();

        if fip.is_assigned_to(self.server_id) {
            info!(floating_ip = %fip.ip, id = fip.id, "{}Floating IP already assigned to this server", tag);
            return FloatingIpAction::AlreadyAssigned;
        }

        if self.settings.dry_run {
            info!(
                floating_ip = %fip.ip,
                id = fip.id,
                current_owner = ?fip.server,
                server_id = self.server_id,
                "[DRY RUN] Would assign floating IP"
            );
            return FloatingIpAction::WouldAssign;
        }

        info!(
            floating_ip = %fip.ip,
            id = fip.id,
            current_owner = ?fip.server,
            server_id = self.server_id,
            "Assigning floating IP"
        );
        match self.cloud.assign_floating_ip(fip.id, self.server_id).await {
            Ok(action) => {
                debug!(floating_ip = %fip.ip, action_id = action.id, status = ?action.status, "Assign action accepted");
                info!(floating_ip = %fip.ip, "Successfully assigned floating IP");
                FloatingIpAction::Assigned
            }
            Err(e) => {
                error!(floating_ip = %fip.ip, id = fip.id, error = %e, "Failed to assign floating IP");
                FloatingIpAction::Failed(e.to_string())
            }
        }
    }

    /// Add the declared alias addresses to this server's private networks.
    pub async fn reconcile_alias_ips(&self) -> AliasOutcome {
        let declared = &self.settings.alias_ips;
        let tag = self.tag();

        if declared.is_empty() {
            info!("{}No alias IPs configured", tag);
            return AliasOutcome::skipped("No alias IPs configured");
        }

        info!(
            count = declared.len(),
            server_id = self.server_id,
            "{}Assigning alias IPs to server",
            tag
        );

        let memberships = match self.cloud.private_networks(self.server_id).await {
            Ok(memberships) => memberships,
            Err(e) => {
                error!(server_id = self.server_id, error = %e, "{}Failed to get private networks", tag);
                return AliasOutcome::failed(format!("Failed to get private networks: {}", e));
            }
        };

        if memberships.is_empty() {
            error!(server_id = self.server_id, "{}{}", tag, NO_PRIVATE_NETWORKS);
            return AliasOutcome::failed(NO_PRIVATE_NETWORKS);
        }

        let plan = plan_aliases(self.matcher.as_ref(), declared, &memberships);

        for ambiguous in &plan.ambiguous {
            warn!(address = ambiguous.address(), "{}{}", tag, ambiguous);
        }
        if !plan.unmatched.is_empty() {
            let addresses: Vec<&str> = plan.unmatched.iter().map(|e| e.address()).collect();
            warn!(
                unmatched = %addresses.join(", "),
                "{}Could not match alias IPs to networks",
                tag
            );
        }

        let mut outcome = AliasOutcome::new();
        outcome.unmatched = plan.unmatched;
        outcome.ambiguous = plan.ambiguous;

        if plan.groups.is_empty() {
            error!("{}{}", tag, NO_MATCHED_ALIASES);
            outcome.success = false;
            outcome.detail = Some(NO_MATCHED_ALIASES.to_string());
            return outcome;
        }

        for group in plan.groups {
            let merge = merge_aliases(&group.existing, &group.addresses);

            let action = if merge.is_unchanged() {
                info!(network = group.network, "{}Aliases already configured on network", tag);
                AliasAction::AlreadyConfigured
            } else if self.settings.dry_run {
                info!(
                    network = group.network,
                    added = %merge.added.join(", "),
                    "[DRY RUN] Would add aliases to network"
                );
                AliasAction::WouldUpdate
            } else {
                info!(
                    network = group.network,
                    added = %merge.added.join(", "),
                    "Assigning alias IPs to network"
                );
                match self
                    .cloud
                    .change_alias_ips(self.server_id, group.network, &merge.merged)
                    .await
                {
                    Ok(_) => {
                        info!(network = group.network, "Successfully assigned aliases to network");
                        AliasAction::Updated
                    }
                    Err(e) => {
                        error!(network = group.network, error = %e, "Failed to assign alias IPs");
                        AliasAction::Failed(e.to_string())
                    }
                }
            };

            outcome.record(AliasChange {
                network: group.network,
                existing: group.existing,
                added: merge.added,
                alias_ips: merge.merged,
                action,
            });
        }

        outcome
    }
}
