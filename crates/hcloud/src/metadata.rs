//! Instance metadata client: "which server am I?"

use crate::error::MetadataError;
use crate::types::ServerId;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Link-local metadata endpoint available on every Hetzner Cloud server
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/hetzner/v1/metadata";

/// Metadata lookups are local; anything slower means we are not on Hetzner Cloud.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves the identity of the server this process runs on.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn server_id(&self) -> Result<ServerId, MetadataError>;

    /// Best-effort hostname, used for log context only
    async fn hostname(&self) -> Option<String> {
        None
    }
}

/// HTTP client for the instance metadata service
pub struct MetadataService {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataService {
    pub fn new(timeout: Duration) -> Result<Self, MetadataError> {
        Self::with_base_url(DEFAULT_METADATA_URL, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MetadataError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, key: &str) -> Result<String, MetadataError> {
        let url = format!("{}/{}", self.base_url, key);
        debug!(url = %url, "Querying metadata service");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl IdentityResolver for MetadataService {
    async fn server_id(&self) -> Result<ServerId, MetadataError> {
        let body = self.fetch("instance-id").await?;
        parse_server_id(&body)
    }

    async fn hostname(&self) -> Option<String> {
        match self.fetch("hostname").await {
            Ok(body) => Some(body.trim().to_string()).filter(|h| !h.is_empty()),
            Err(e) => {
                debug!(error = %e, "Hostname lookup failed");
                None
            }
        }
    }
}

/// Parse the plain-text body of the `instance-id` endpoint.
pub fn parse_server_id(body: &str) -> Result<ServerId, MetadataError> {
    let trimmed = body.trim();
    trimmed
        .parse::<ServerId>()
        .map_err(|_| MetadataError::InvalidServerId(trimmed.to_string()))
}

/// Identity supplied on the command line instead of the metadata service.
#[derive(Debug, Clone, Copy)]
pub struct FixedIdentity(ServerId);

impl FixedIdentity {
    pub fn new(server_id: ServerId) -> Self {
        Self(server_id)
    }
}

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn server_id(&self) -> Result<ServerId, MetadataError> {
        Ok(self.0)
    }
}
