use crate::{
    constants::GENESIS_PREVIOUS_HASH,
    pow::{self, check_proof},
    Block, LedgerError, RejectReason, Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordered sequence of sealed blocks, genesis at index 0.
///
/// Blocks only get in through [`Chain::try_append`], so every `Chain` value
/// satisfies the continuity and proof-of-work invariants, and every block's
/// `index` equals its position.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Chain {
    /// An empty chain; the next append must carry `previous_hash == "0"`.
    pub fn new(difficulty: u32) -> Self {
        Self {
            blocks: Vec::new(),
            difficulty,
        }
    }

    pub fn create_genesis(difficulty: u32) -> Self {
        let mut chain = Self::new(difficulty);
        let mut genesis = Block::new(0, vec![], GENESIS_PREVIOUS_HASH, difficulty, "");
        let (_, hash) = pow::solve(&mut genesis, difficulty);
        chain
            .try_append(genesis, &hash)
            .expect("freshly solved genesis extends an empty chain");
        chain
    }

    /// Rebuilds a chain from wire records by replaying every append. Any record
    /// that would be refused locally fails the whole import.
    pub fn from_records(records: Vec<Block>, difficulty: u32) -> Result<Self, LedgerError> {
        if records.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        let mut chain = Self::new(difficulty);
        for (position, record) in records.into_iter().enumerate() {
            let claimed = record.hash.clone();
            chain
                .try_append(record, &claimed)
                .map_err(|_| LedgerError::TamperedChain { index: position })?;
        }
        Ok(chain)
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        find_block(&self.blocks, index)
    }

    pub fn find_transaction(&self, hash: &str) -> Option<&Transaction> {
        find_transaction(&self.blocks, hash)
    }

    /// Hash the next block must point at.
    pub fn tip_hash(&self) -> &str {
        self.last_block()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_PREVIOUS_HASH)
    }

    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn try_append(&mut self, mut block: Block, claimed_hash: &str) -> Result<(), LedgerError> {
        let index = block.index;
        let reject = move |reason| LedgerError::RejectedBlock { index, reason };
        if block.previous_hash != self.tip_hash() {
            return Err(reject(RejectReason::BrokenContinuity));
        }
        if index != self.next_index() {
            return Err(reject(RejectReason::OutOfSequence));
        }
        check_proof(&block, claimed_hash, self.difficulty).map_err(reject)?;

        block.hash = claimed_hash.to_string();
        self.blocks.push(block);
        Ok(())
    }

    /// Boolean form of [`Chain::try_append`]: rejection is an ordinary outcome.
    pub fn append(&mut self, block: Block, claimed_hash: &str) -> bool {
        match self.try_append(block, claimed_hash) {
            Ok(()) => true,
            Err(e) => {
                debug!("append refused: {e}");
                false
            }
        }
    }

    /// Checks a sequence of block records without building a chain. Stored
    /// hashes are compared against recomputed digests and against the running
    /// previous-hash pointer starting from the root sentinel. Indices must count
    /// up from 0.
    pub fn validate(records: &[Block], difficulty: u32) -> bool {
        if records.is_empty() {
            return false;
        }
        let mut previous_hash = GENESIS_PREVIOUS_HASH;
        for (position, record) in (0u64..).zip(records) {
            if record.previous_hash != previous_hash
                || record.index != position
                || !pow::is_valid_proof(record, &record.hash, difficulty)
            {
                return false;
            }
            previous_hash = record.hash.as_str();
        }
        true
    }

    pub fn snapshot(&self, peer_list: Vec<String>) -> ChainSnapshot {
        ChainSnapshot {
            length: self.blocks.len(),
            chain: self.blocks.clone(),
            peer_list,
        }
    }
}

/// Position lookup. Records from the wire are not trusted to be numbered by
/// position, so the stored index must agree too.
fn find_block(blocks: &[Block], index: u64) -> Option<&Block> {
    usize::try_from(index)
        .ok()
        .and_then(|position| blocks.get(position))
        .filter(|b| b.index == index)
}

fn find_transaction<'a>(blocks: &'a [Block], hash: &str) -> Option<&'a Transaction> {
    blocks
        .iter()
        .flat_map(|b| b.transactions.iter())
        .find(|t| t.hash == hash)
}

/// `GET /chain` body; also returned by peer registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub length: usize,
    pub chain: Vec<Block>,
    pub peer_list: Vec<String>,
}

impl ChainSnapshot {
    pub fn block(&self, index: u64) -> Option<&Block> {
        find_block(&self.chain, index)
    }

    pub fn find_transaction(&self, hash: &str) -> Option<&Transaction> {
        find_transaction(&self.chain, hash)
    }

    pub fn transaction_count(&self) -> usize {
        self.chain.iter().map(|b| b.transactions.len()).sum()
    }
}

/// Longest-valid-chain rule over `(source, snapshot)` pairs: the longest snapshot
/// that is strictly longer than `current_len` and passes [`Chain::validate`].
/// A snapshot whose declared length disagrees with its record count is ignored.
/// Ties keep the first seen.
pub fn longest_valid<I>(current_len: usize, candidates: I, difficulty: u32) -> Option<(String, ChainSnapshot)>
where
    I: IntoIterator<Item = (String, ChainSnapshot)>,
{
    let mut best_len = current_len;
    let mut best = None;
    for (source, snapshot) in candidates {
        if snapshot.length != snapshot.chain.len() {
            debug!(peer = %source, "declared length {} but sent {} blocks", snapshot.length, snapshot.chain.len());
            continue;
        }
        if snapshot.length > best_len && Chain::validate(&snapshot.chain, difficulty) {
            best_len = snapshot.length;
            best = Some((source, snapshot));
        }
    }
    best
}
