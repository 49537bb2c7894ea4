//! Hetzner Cloud resource types.
//!
//! Only the fields the failover logic reads are modelled; unknown fields in
//! API responses are ignored.

use crate::error::ApiError;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Server identifier
pub type ServerId = u64;

/// Floating IP identifier
pub type FloatingIpId = u64;

/// Private network identifier
pub type NetworkId = u64;

/// Action identifier
pub type ActionId = u64;

/// Exact-match label selector.
///
/// Every key/value pair must be present on a resource for it to match. An
/// empty selector is never sent to the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `labels` carries every pair of this selector.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.is_empty() && self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    /// Render in the `label_selector` query syntax (`k1==v1,k2==v2`).
    pub fn to_query(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}=={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSelector {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Floating IP as returned by `GET /floating_ips`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: FloatingIpId,

    /// Address (IPv4) or network (IPv6, e.g. `2001:db8::/64`)
    pub ip: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type", default)]
    pub ip_type: Option<String>,

    /// Current owner, if assigned
    #[serde(default)]
    pub server: Option<ServerId>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl FloatingIp {
    pub fn is_assigned_to(&self, server: ServerId) -> bool {
        self.server == Some(server)
    }
}

/// Server as returned by `GET /servers/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub private_net: Vec<PrivateNet>,
}

/// Attachment of a server to a private network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateNet {
    pub network: NetworkId,

    /// The server's own address on this network
    pub ip: String,

    #[serde(default)]
    pub alias_ips: Vec<String>,

    #[serde(default)]
    pub mac_address: Option<String>,
}

/// Private network as returned by `GET /networks/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,

    #[serde(default)]
    pub name: String,

    pub ip_range: String,

    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(default)]
    pub ip_range: Option<String>,

    #[serde(default)]
    pub gateway: Option<String>,
}

impl Network {
    /// Narrowest known range containing `ip`.
    ///
    /// Subnets are preferred over the network-wide range.
    pub fn range_for(&self, ip: IpAddr) -> Option<IpNet> {
        self.subnets
            .iter()
            .filter_map(|s| s.ip_range.as_deref())
            .chain(std::iter::once(self.ip_range.as_str()))
            .filter_map(|r| r.parse::<IpNet>().ok())
            .filter(|r| r.contains(&ip))
            .max_by_key(|r| r.prefix_len())
    }
}

/// This server's view of one private network, ready for address matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetMembership {
    pub network: NetworkId,

    /// The server's own address on this network
    pub ip: IpAddr,

    /// Alias addresses currently configured on this network
    pub alias_ips: Vec<String>,

    /// Subnet range, when it has been looked up
    pub ip_range: Option<IpNet>,
}

impl SubnetMembership {
    pub fn new(network: NetworkId, ip: IpAddr, alias_ips: Vec<String>) -> Self {
        Self {
            network,
            ip,
            alias_ips,
            ip_range: None,
        }
    }

    pub fn with_range(mut self, range: IpNet) -> Self {
        self.ip_range = Some(range);
        self
    }
}

impl TryFrom<&PrivateNet> for SubnetMembership {
    type Error = ApiError;

    fn try_from(net: &PrivateNet) -> Result<Self, Self::Error> {
        let ip = net
            .ip
            .parse::<IpAddr>()
            .map_err(|_| ApiError::InvalidAddress {
                network: net.network,
                address: net.ip.clone(),
            })?;
        Ok(SubnetMembership::new(net.network, ip, net.alias_ips.clone()))
    }
}

/// Action status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

/// Asynchronous action started by a mutating call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub command: String,
    pub status: ActionStatus,

    #[serde(default)]
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

// Response envelopes

#[derive(Debug, Deserialize)]
pub(crate) struct FloatingIpsResponse {
    pub floating_ips: Vec<FloatingIp>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerResponse {
    pub server: Server,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NetworkResponse {
    pub network: Network,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse {
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}
