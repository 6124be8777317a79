use crate::{client::PeerClient, config::NodeConfig};
use chainmesh_core::{Ledger, NodeId};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle passed to request handlers, the miner loop and sync calls.
///
/// `ledger` is the only mutable state; network calls are made with the lock
/// released and their results applied in a short write section afterwards.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub client: PeerClient,
    pub node_id: NodeId,
    pub public_address: String,
}

impl AppState {
    /// Mines genesis, derives the node identity and lists this node as its own
    /// first peer.
    pub fn new(config: &NodeConfig) -> Self {
        let mut ledger = Ledger::new(config.difficulty);
        ledger.merge_peers([config.public_address.clone()]);
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            client: PeerClient::new(),
            node_id: NodeId::generate(&config.public_address),
            public_address: config.public_address.clone(),
        }
    }

    pub async fn difficulty(&self) -> u32 {
        self.ledger.read().await.difficulty()
    }
}
