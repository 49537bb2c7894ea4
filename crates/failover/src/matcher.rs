//! Maps declared alias addresses onto the server's private subnets.
//!
//! Hetzner attaches alias IPs per private network, so every declared address
//! has to be routed to the network it belongs to. The default
//! [`PrefixMatcher`] infers that from the server's own address on each
//! network; [`CidrMatcher`] uses the real subnet range when it is known.

use hcloud::{NetworkId, SubnetMembership};
use ipnet::IpNet;
use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;

/// Characters of the canonical IPv6 text form compared by [`PrefixMatcher`].
pub const IPV6_PREFIX_CHARS: usize = 19;

/// Why a declared alias address was not (or not unambiguously) matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Invalid alias IP '{address}'")]
    Unparseable { address: String },

    #[error("Alias IP {address} does not belong to any attached private network")]
    NoSubnet { address: String },

    #[error("Alias IP {address} matches networks {candidates:?}, using network {chosen}")]
    Ambiguous {
        address: String,
        chosen: NetworkId,
        candidates: Vec<NetworkId>,
    },
}

impl MatchError {
    /// The declared address this error is about.
    pub fn address(&self) -> &str {
        match self {
            MatchError::Unparseable { address }
            | MatchError::NoSubnet { address }
            | MatchError::Ambiguous { address, .. } => address,
        }
    }
}

/// Decides whether an address lives on a given private network.
pub trait SubnetMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, membership: &SubnetMembership, address: IpAddr) -> bool;
}

/// Fixed-prefix heuristic: same /24 for IPv4, same leading
/// [`IPV6_PREFIX_CHARS`] characters of the canonical text form for IPv6.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixMatcher;

impl SubnetMatcher for PrefixMatcher {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn matches(&self, membership: &SubnetMembership, address: IpAddr) -> bool {
        match (membership.ip, address) {
            (IpAddr::V4(own), IpAddr::V4(alias)) => own.octets()[..3] == alias.octets()[..3],
            (IpAddr::V6(own), IpAddr::V6(alias)) => {
                v6_prefix(&own.to_string()) == v6_prefix(&alias.to_string())
            }
            _ => false,
        }
    }
}

fn v6_prefix(canonical: &str) -> &str {
    &canonical[..canonical.len().min(IPV6_PREFIX_CHARS)]
}

/// Compares against the membership's subnet range, falling back to
/// [`PrefixMatcher`] for memberships whose range is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct CidrMatcher;

impl SubnetMatcher for CidrMatcher {
    fn name(&self) -> &'static str {
        "cidr"
    }

    fn matches(&self, membership: &SubnetMembership, address: IpAddr) -> bool {
        match membership.ip_range {
            Some(range) => range.contains(&address),
            None => PrefixMatcher.matches(membership, address),
        }
    }
}

/// Parse a declared alias, which may carry a `/prefix` suffix.
pub fn parse_alias(declared: &str) -> Result<IpAddr, MatchError> {
    let trimmed = declared.trim();
    if let Ok(net) = trimmed.parse::<IpNet>() {
        return Ok(net.addr());
    }
    trimmed
        .parse::<IpAddr>()
        .map_err(|_| MatchError::Unparseable {
            address: declared.to_string(),
        })
}

/// Result of matching one declared address.
#[derive(Debug, Clone)]
pub struct MatchedSubnet<'a> {
    pub membership: &'a SubnetMembership,
    pub address: IpAddr,

    /// Every network that matched, in membership order
    pub candidates: Vec<NetworkId>,
}

impl MatchedSubnet<'_> {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Find the membership a declared address belongs to.
///
/// The first matching membership wins, in the order the provider lists them.
pub fn match_subnet<'a>(
    matcher: &dyn SubnetMatcher,
    declared: &str,
    memberships: &'a [SubnetMembership],
) -> Result<MatchedSubnet<'a>, MatchError> {
    let address = parse_alias(declared)?;

    let mut matching = memberships
        .iter()
        .filter(|m| matcher.matches(m, address))
        .peekable();

    let membership = *matching.peek().ok_or_else(|| MatchError::NoSubnet {
        address: declared.to_string(),
    })?;
    let candidates = matching.map(|m| m.network).collect();

    Ok(MatchedSubnet {
        membership,
        address,
        candidates,
    })
}

/// Declared addresses routed to one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasGroup {
    pub network: NetworkId,

    /// Aliases currently on the network
    pub existing: Vec<String>,

    /// Declared addresses for this network, as written in the config
    pub addresses: Vec<String>,
}

/// Declared addresses partitioned by network.
#[derive(Debug, Clone, Default)]
pub struct AliasPlan {
    /// Groups in order of first appearance in the declaration
    pub groups: Vec<AliasGroup>,

    /// Addresses excluded from assignment
    pub unmatched: Vec<MatchError>,

    /// Addresses assigned to the first of several matching networks
    pub ambiguous: Vec<MatchError>,
}

/// Route every declared address to its network.
pub fn plan_aliases(
    matcher: &dyn SubnetMatcher,
    declared: &[String],
    memberships: &[SubnetMembership],
) -> AliasPlan {
    let mut plan = AliasPlan::default();

    for address in declared {
        let matched = match match_subnet(matcher, address, memberships) {
            Ok(matched) => matched,
            Err(e) => {
                plan.unmatched.push(e);
                continue;
            }
        };

        if matched.is_ambiguous() {
            plan.ambiguous.push(MatchError::Ambiguous {
                address: address.clone(),
                chosen: matched.membership.network,
                candidates: matched.candidates.clone(),
            });
        }

        let network = matched.membership.network;
        match plan.groups.iter_mut().find(|g| g.network == network) {
            Some(group) => {
                if !group
                    .addresses
                    .iter()
                    .any(|a| alias_key(a) == alias_key(address))
                {
                    group.addresses.push(address.clone());
                }
            }
            None => plan.groups.push(AliasGroup {
                network,
                existing: matched.membership.alias_ips.clone(),
                addresses: vec![address.clone()],
            }),
        }
    }

    plan
}

/// Union of an existing alias list and new addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMerge {
    /// Full list to write back; always starts with the existing entries
    pub merged: Vec<String>,

    /// Entries of `merged` that were not present before
    pub added: Vec<String>,
}

impl AliasMerge {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty()
    }
}

/// Merge `additions` into `existing` without dropping anything.
///
/// Entries are compared by address, so `10.0.0.100` and `10.0.0.100/32`
/// count as the same alias. Existing entries keep their spelling.
pub fn merge_aliases(existing: &[String], additions: &[String]) -> AliasMerge {
    let mut seen: HashSet<String> = existing.iter().map(|a| alias_key(a)).collect();
    let mut merged = existing.to_vec();
    let mut added = Vec::new();

    for alias in additions {
        if seen.insert(alias_key(alias)) {
            merged.push(alias.clone());
            added.push(alias.clone());
        }
    }

    AliasMerge { merged, added }
}

fn alias_key(alias: &str) -> String {
    match parse_alias(alias) {
        Ok(addr) => addr.to_string(),
        Err(_) => alias.trim().to_string(),
    }
}
