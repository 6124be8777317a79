use crate::LedgerError;
use std::collections::BTreeSet;

/// Known node endpoints. Append-only and unauthenticated: anyone may add any
/// address, and unreachable entries stay until the process exits.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the address was not known before.
    pub fn insert(&mut self, address: &str) -> Result<bool, LedgerError> {
        if address.is_empty() {
            return Err(LedgerError::InvalidPeerAddress);
        }
        Ok(self.peers.insert(address.to_string()))
    }

    /// Bulk merge from a peer list received over the wire; blank entries are dropped.
    pub fn extend<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers.extend(
            addresses
                .into_iter()
                .map(Into::into)
                .filter(|a: &String| !a.is_empty()),
        );
    }

    pub fn contains(&self, address: &str) -> bool {
        self.peers.contains(address)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    /// Every peer except `own_address`, the fan-out set for network calls.
    pub fn others(&self, own_address: &str) -> Vec<String> {
        self.peers
            .iter()
            .filter(|p| p.as_str() != own_address)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates() {
        let mut peers = PeerRegistry::new();
        assert_eq!(peers.insert("http://a"), Ok(true));
        assert_eq!(peers.insert("http://a"), Ok(false));
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn insert_rejects_empty() {
        let mut peers = PeerRegistry::new();
        assert_eq!(peers.insert(""), Err(LedgerError::InvalidPeerAddress));
        assert!(peers.is_empty());
    }

    #[test]
    fn extend_skips_blank_and_merges() {
        let mut peers = PeerRegistry::new();
        peers.insert("http://a").unwrap();
        peers.extend(vec!["http://a", "", "http://b"]);
        assert_eq!(peers.to_vec(), vec!["http://a", "http://b"]);
    }

    #[test]
    fn others_skips_self() {
        let mut peers = PeerRegistry::new();
        peers.extend(["http://me", "http://a", "http://b"]);
        assert_eq!(peers.others("http://me"), vec!["http://a", "http://b"]);
        assert!(peers.contains("http://me"));
    }
}
