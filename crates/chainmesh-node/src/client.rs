use crate::constants::{ANNOUNCE_TIMEOUT, BOOTSTRAP_TIMEOUT, CONSENSUS_TIMEOUT};
use chainmesh_core::{Block, ChainSnapshot};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer {peer} unreachable: {source}")]
    Unreachable {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("peer {peer} sent an unreadable body: {source}")]
    Malformed {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("peer {peer} answered {status}: {body}")]
    Status {
        peer: String,
        status: StatusCode,
        body: String,
    },
}

/// Body of every request that names a node endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeAddress {
    #[serde(default)]
    pub node_address: String,
}

/// Outbound HTTP to other nodes. Every call carries its own timeout; failures
/// are returned, never retried.
#[derive(Clone, Debug, Default)]
pub struct PeerClient {
    http: Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
        let res = self
            .http
            .get(format!("{peer}/chain"))
            .timeout(CONSENSUS_TIMEOUT)
            .send()
            .await
            .map_err(unreachable_err(peer))?;
        json_or_status(peer, res).await
    }

    /// `POST /register_node` on `target`, returning its chain and peer list.
    pub async fn register_node(&self, target: &str, own_address: &str) -> Result<ChainSnapshot, PeerError> {
        let res = self
            .http
            .post(format!("{target}/register_node"))
            .json(&NodeAddress {
                node_address: own_address.to_string(),
            })
            .timeout(BOOTSTRAP_TIMEOUT)
            .send()
            .await
            .map_err(unreachable_err(target))?;
        json_or_status(target, res).await
    }

    pub async fn post_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        self.post_expecting_success(peer, "add_block", block, ANNOUNCE_TIMEOUT)
            .await
    }

    pub async fn update_peers(&self, peer: &str, own_address: &str) -> Result<(), PeerError> {
        let body = NodeAddress {
            node_address: own_address.to_string(),
        };
        self.post_expecting_success(peer, "update_peers", &body, ANNOUNCE_TIMEOUT)
            .await
    }

    async fn post_expecting_success<T: Serialize + ?Sized>(
        &self,
        peer: &str,
        route: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<(), PeerError> {
        let res = self
            .http
            .post(format!("{peer}/{route}"))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(unreachable_err(peer))?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(status_error(peer, res).await)
    }
}

fn unreachable_err(peer: &str) -> impl FnOnce(reqwest::Error) -> PeerError + '_ {
    move |source| PeerError::Unreachable {
        peer: peer.to_string(),
        source,
    }
}

async fn status_error(peer: &str, res: reqwest::Response) -> PeerError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    PeerError::Status {
        peer: peer.to_string(),
        status,
        body,
    }
}

async fn json_or_status(peer: &str, res: reqwest::Response) -> Result<ChainSnapshot, PeerError> {
    if !res.status().is_success() {
        return Err(status_error(peer, res).await);
    }
    res.json().await.map_err(|source| PeerError::Malformed {
        peer: peer.to_string(),
        source,
    })
}
