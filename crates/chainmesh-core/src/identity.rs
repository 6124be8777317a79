use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};
use std::fmt;

/// Miner attribution stamped on mined blocks. Not a credential.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Digest of the endpoint plus a nonce picked once per process.
    pub fn generate(endpoint: &str) -> Self {
        let nonce: u64 = rand::thread_rng().gen();
        Self::derive(endpoint, &nonce.to_string())
    }

    pub fn derive(endpoint: &str, nonce: &str) -> Self {
        let mut hasher = Sha224::new();
        hasher.update(endpoint.as_bytes());
        hasher.update(nonce.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_ID_HEX_SIZE: usize = 56;

    #[test]
    fn derive_is_deterministic() {
        let a = NodeId::derive("http://127.0.0.1:8000", "0.42");
        let b = NodeId::derive("http://127.0.0.1:8000", "0.42");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), NODE_ID_HEX_SIZE);
    }

    #[test]
    fn generate_differs_between_processes_on_same_endpoint() {
        let a = NodeId::generate("http://127.0.0.1:8000");
        let b = NodeId::generate("http://127.0.0.1:8000");
        assert_ne!(a, b);
    }
}
