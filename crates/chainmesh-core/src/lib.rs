use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod mine;
pub mod peers;
pub mod pool;

pub use chain::{Chain, ChainSnapshot};
pub use error::{LedgerError, RejectReason};
pub use identity::NodeId;
pub use ledger::Ledger;
pub use peers::PeerRegistry;
pub use pool::TransactionPool;

/// Lowercase hex SHA-256 digest.
pub type HexHash = String;

/// Milliseconds since the Unix epoch. Integral so block records survive a JSON
/// round trip without changing their digest.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}

pub fn sha256_hex(bytes: &[u8]) -> HexHash {
    hex::encode(Sha256::digest(bytes))
}

// Fields are declared in key order: the serialized form doubles as the
// canonical sealing input and peers compare digests byte for byte.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub author: String,
    pub content: String,
    pub hash: HexHash,
    pub timestamp: u64,
}

#[derive(Serialize)]
struct TransactionPreimage<'a> {
    author: &'a str,
    content: &'a str,
    timestamp: u64,
}

impl Transaction {
    /// Content-addresses a new transaction. The hash is fixed from here on.
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_timestamp(author, content, now_millis())
    }

    pub fn with_timestamp(
        author: impl Into<String>,
        content: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        let author = author.into();
        let content = content.into();
        let hash = Self::content_hash(&author, &content, timestamp);
        Self {
            author,
            content,
            hash,
            timestamp,
        }
    }

    pub fn content_hash(author: &str, content: &str, timestamp: u64) -> HexHash {
        let preimage = TransactionPreimage {
            author,
            content,
            timestamp,
        };
        sha256_hex(&serde_json::to_vec(&preimage).expect("plain struct serializes"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub timestamp: u64,
    pub previous_hash: HexHash,
    pub nonce: u64,
    pub difficulty: u32,
    pub miner: String,
    /// Empty until the block is sealed and accepted into a chain.
    #[serde(default)]
    pub hash: HexHash,
}

/// Everything but `hash`, keys sorted.
#[derive(Serialize)]
struct BlockPreimage<'a> {
    difficulty: u32,
    index: u64,
    miner: &'a str,
    nonce: u64,
    previous_hash: &'a str,
    timestamp: u64,
    transactions: &'a [Transaction],
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        difficulty: u32,
        miner: impl Into<String>,
    ) -> Self {
        Self {
            index,
            transactions,
            timestamp: now_millis(),
            previous_hash: previous_hash.into(),
            nonce: 0,
            difficulty,
            miner: miner.into(),
            hash: HexHash::new(),
        }
    }

    pub fn preimage_bytes(&self, nonce: u64) -> Vec<u8> {
        let preimage = BlockPreimage {
            difficulty: self.difficulty,
            index: self.index,
            miner: &self.miner,
            nonce,
            previous_hash: &self.previous_hash,
            timestamp: self.timestamp,
            transactions: &self.transactions,
        };
        serde_json::to_vec(&preimage).expect("plain struct serializes")
    }

    /// Digest of the block as it would be with `nonce`; the stored `hash` never
    /// takes part.
    pub fn hash_with_nonce(&self, nonce: u64) -> HexHash {
        sha256_hex(&self.preimage_bytes(nonce))
    }

    /// The sealing digest over every field except `hash`.
    pub fn compute_hash(&self) -> HexHash {
        self.hash_with_nonce(self.nonce)
    }
}

pub mod pow {
    use super::{Block, HexHash};
    use crate::constants::POW_SENTINEL;
    use crate::error::RejectReason;

    /// Search nonces upward from zero until the digest carries `difficulty`
    /// leading sentinel characters. Sets `block.nonce` to the winner.
    pub fn solve(block: &mut Block, difficulty: u32) -> (u64, HexHash) {
        block.nonce = 0;
        let mut hash = block.compute_hash();
        while !meets_difficulty(&hash, difficulty) {
            block.nonce = block.nonce.wrapping_add(1);
            hash = block.compute_hash();
        }
        (block.nonce, hash)
    }

    pub fn count_leading_sentinels(hash: &str) -> u32 {
        hash.bytes().take_while(|b| *b == POW_SENTINEL).count() as u32
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        count_leading_sentinels(hash) >= difficulty
    }

    pub fn check_proof(block: &Block, candidate: &str, difficulty: u32) -> Result<(), RejectReason> {
        if !meets_difficulty(candidate, difficulty) {
            return Err(RejectReason::InsufficientWork);
        }
        if candidate != block.compute_hash() {
            return Err(RejectReason::HashMismatch);
        }
        Ok(())
    }

    pub fn is_valid_proof(block: &Block, candidate: &str, difficulty: u32) -> bool {
        check_proof(block, candidate, difficulty).is_ok()
    }
}
