//! Thin clients for the Hetzner Cloud API and the instance metadata service.
//!
//! Both are exposed as small capability traits so that callers can run
//! against deterministic substitutes:
//!
//! - [`CloudApi`]: server lookup, floating IP listing and assignment,
//!   private network membership and alias IP replacement
//! - [`IdentityResolver`]: the ID of the server this process runs on
//!
//! # Example
//!
//! ```no_run
//! use hcloud::{CloudApi, HcloudClient, IdentityResolver, LabelSelector, MetadataService};
//! use hcloud::metadata::DEFAULT_METADATA_TIMEOUT;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let me = MetadataService::new(DEFAULT_METADATA_TIMEOUT)?.server_id().await?;
//! let client = HcloudClient::new("token")?;
//!
//! let selector: LabelSelector = [("role", "vrrp")].into_iter().collect();
//! for fip in client.floating_ips(&selector).await? {
//!     if !fip.is_assigned_to(me) {
//!         client.assign_floating_ip(fip.id, me).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod metadata;
pub mod types;

pub use client::{CloudApi, HcloudClient};
pub use error::{ApiError, MetadataError};
pub use metadata::{FixedIdentity, IdentityResolver, MetadataService};
pub use types::{
    Action, ActionStatus, FloatingIp, FloatingIpId, LabelSelector, Network, NetworkId, PrivateNet,
    Server, ServerId, SubnetMembership,
};
