//! Hetzner Cloud API client.

use crate::error::ApiError;
use crate::types::{
    Action, ActionResponse, ActionStatus, ErrorResponse, FloatingIp, FloatingIpId,
    FloatingIpsResponse, LabelSelector, Network, NetworkId, NetworkResponse, Server, ServerId,
    ServerResponse, SubnetMembership,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Public Hetzner Cloud API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_SIZE: u32 = 50;

/// Cloud API operations needed to take over a virtual IP set.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Look up a server by ID
    async fn server(&self, id: ServerId) -> Result<Server, ApiError>;

    /// List all floating IPs carrying every label of `selector`
    async fn floating_ips(&self, selector: &LabelSelector) -> Result<Vec<FloatingIp>, ApiError>;

    /// Assign a floating IP to a server
    async fn assign_floating_ip(
        &self,
        floating_ip: FloatingIpId,
        server: ServerId,
    ) -> Result<Action, ApiError>;

    /// Private networks the server is attached to
    async fn private_networks(&self, server: ServerId) -> Result<Vec<SubnetMembership>, ApiError>;

    /// Replace the alias IP list of a server on one network
    async fn change_alias_ips(
        &self,
        server: ServerId,
        network: NetworkId,
        alias_ips: &[String],
    ) -> Result<Action, ApiError>;
}

/// [`CloudApi`] implementation backed by the Hetzner Cloud REST API
pub struct HcloudClient {
    client: reqwest::Client,
    endpoint: String,
    resolve_ranges: bool,
}

#[derive(Serialize)]
struct AssignRequest {
    server: ServerId,
}

#[derive(Serialize)]
struct ChangeAliasIpsRequest<'a> {
    network: NetworkId,
    alias_ips: &'a [String],
}

impl HcloudClient {
    /// Create a client for the public API endpoint
    pub fn new(token: &str) -> Result<Self, ApiError> {
        Self::with_endpoint(token, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT)
    }

    /// Create a client for a specific endpoint
    pub fn with_endpoint(
        token: &str,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| ApiError::InvalidToken(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("hetzner-vrrp-failover/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            resolve_ranges: false,
        })
    }

    /// Also look up each network's subnet ranges in [`CloudApi::private_networks`].
    ///
    /// Costs one extra request per attached network.
    pub fn with_subnet_ranges(mut self, enabled: bool) -> Self {
        self.resolve_ranges = enabled;
        self
    }

    /// Look up a private network by ID
    pub async fn network(&self, id: NetworkId) -> Result<Network, ApiError> {
        let response: NetworkResponse = self.get(&format!("/networks/{}", id), &[]).await?;
        Ok(response.network)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => (err.error.code, err.error.message),
            Err(_) => ("unknown".to_string(), body),
        };

        Err(ApiError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    fn check_action(action: Action) -> Result<Action, ApiError> {
        if action.status == ActionStatus::Error {
            let message = action
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ApiError::ActionFailed {
                id: action.id,
                command: action.command,
                message,
            });
        }
        Ok(action)
    }
}

#[async_trait]
impl CloudApi for HcloudClient {
    async fn server(&self, id: ServerId) -> Result<Server, ApiError> {
        match self
            .get::<ServerResponse>(&format!("/servers/{}", id), &[])
            .await
        {
            Ok(response) => Ok(response.server),
            Err(ApiError::Api { status: 404, .. }) => Err(ApiError::ServerNotFound(id)),
            Err(e) => Err(e),
        }
    }

    async fn floating_ips(&self, selector: &LabelSelector) -> Result<Vec<FloatingIp>, ApiError> {
        let mut floating_ips = Vec::new();
        let mut page = 1;

        loop {
            let query = [
                ("label_selector", selector.to_query()),
                ("page", page.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ];
            let response: FloatingIpsResponse = self.get("/floating_ips", &query).await?;
            floating_ips.extend(response.floating_ips);

            match response
                .meta
                .and_then(|m| m.pagination)
                .and_then(|p| p.next_page)
            {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(floating_ips)
    }

    async fn assign_floating_ip(
        &self,
        floating_ip: FloatingIpId,
        server: ServerId,
    ) -> Result<Action, ApiError> {
        let response: ActionResponse = self
            .post(
                &format!("/floating_ips/{}/actions/assign", floating_ip),
                &AssignRequest { server },
            )
            .await?;
        Self::check_action(response.action)
    }

    async fn private_networks(&self, server: ServerId) -> Result<Vec<SubnetMembership>, ApiError> {
        let server = self.server(server).await?;

        let mut memberships = Vec::with_capacity(server.private_net.len());
        for net in &server.private_net {
            let mut membership = SubnetMembership::try_from(net)?;
            if self.resolve_ranges {
                match self.network(net.network).await {
                    Ok(network) => membership.ip_range = network.range_for(membership.ip),
                    Err(e) => {
                        warn!(network = net.network, error = %e, "Failed to look up subnet range");
                    }
                }
            }
            memberships.push(membership);
        }

        Ok(memberships)
    }

    async fn change_alias_ips(
        &self,
        server: ServerId,
        network: NetworkId,
        alias_ips: &[String],
    ) -> Result<Action, ApiError> {
        let response: ActionResponse = self
            .post(
                &format!("/servers/{}/actions/change_alias_ips", server),
                &ChangeAliasIpsRequest { network, alias_ips },
            )
            .await?;
        Self::check_action(response.action)
    }
}
