//! Errors raised by the Hetzner Cloud and metadata clients.

use crate::types::{ActionId, NetworkId, ServerId};
use thiserror::Error;

/// Failure of a single Cloud API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Server with ID {0} not found")]
    ServerNotFound(ServerId),

    #[error("Action {id} ({command}) failed: {message}")]
    ActionFailed {
        id: ActionId,
        command: String,
        message: String,
    },

    #[error("Invalid address '{address}' reported for network {network}")]
    InvalidAddress { network: NetworkId, address: String },

    #[error("Invalid API token: {0}")]
    InvalidToken(String),
}

impl From<ApiError> for common::Error {
    fn from(e: ApiError) -> Self {
        common::Error::api(e)
    }
}

/// Failure to resolve this node's identity.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Timeout connecting to metadata service. Are you running this on a Hetzner Cloud server?")]
    Timeout,

    #[error("Failed to connect to metadata service: {0}")]
    Request(reqwest::Error),

    #[error("Invalid server ID from metadata service: {0}")]
    InvalidServerId(String),
}

impl From<reqwest::Error> for MetadataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MetadataError::Timeout
        } else {
            MetadataError::Request(e)
        }
    }
}

impl From<MetadataError> for common::Error {
    fn from(e: MetadataError) -> Self {
        common::Error::metadata(e)
    }
}
