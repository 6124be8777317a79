//! The single state container a node owns: chain, unconfirmed pool and peers.
//!
//! Every mutation goes through `&mut Ledger`, so whoever shares it across tasks
//! (the node wraps it in one `RwLock`) gets serialized writes for free. Mining is
//! split in three steps so the expensive proof-of-work can run without holding
//! that lock: [`Ledger::prepare_candidate`], solve, [`Ledger::commit_mined`].

use crate::{
    pow, Block, Chain, ChainSnapshot, LedgerError, PeerRegistry, Transaction, TransactionPool,
};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Chain,
    pool: TransactionPool,
    peers: PeerRegistry,
}

impl Ledger {
    /// Fresh ledger holding only a newly mined genesis block.
    pub fn new(difficulty: u32) -> Self {
        Self::with_chain(Chain::create_genesis(difficulty))
    }

    pub fn with_chain(chain: Chain) -> Self {
        Self {
            chain,
            pool: TransactionPool::new(),
            peers: PeerRegistry::new(),
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn difficulty(&self) -> u32 {
        self.chain.difficulty()
    }

    pub fn submit_transaction(&mut self, author: &str, content: &str) -> Result<Transaction, LedgerError> {
        self.pool.submit(author, content)
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.pending().to_vec()
    }

    pub fn register_peer(&mut self, address: &str) -> Result<bool, LedgerError> {
        self.peers.insert(address)
    }

    pub fn merge_peers<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers.extend(addresses);
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        self.chain.snapshot(self.peers.to_vec())
    }

    /// A block sent by a peer. Same verification as a local append; the
    /// record's own `hash` is the claimed proof.
    pub fn receive_block(&mut self, block: Block) -> Result<(), LedgerError> {
        let claimed = block.hash.clone();
        let index = block.index;
        self.chain.try_append(block, &claimed)?;
        info!("accepted block #{index} from the network");
        Ok(())
    }

    /// Drains the pool into an unsolved block on top of the current tip.
    /// `None` when there is nothing to mine.
    pub fn prepare_candidate(&mut self, miner: &str) -> Option<Block> {
        if self.pool.is_empty() {
            return None;
        }
        let transactions = self.pool.take_all();
        Some(Block::new(
            self.chain.next_index(),
            transactions,
            self.chain.tip_hash(),
            self.difficulty(),
            miner,
        ))
    }

    /// Appends a solved candidate. If the tip moved while solving the block is
    /// dropped and its transactions go back to the pool.
    pub fn commit_mined(&mut self, block: Block, hash: &str) -> bool {
        let transactions = block.transactions.clone();
        match self.chain.try_append(block, hash) {
            Ok(()) => true,
            Err(e) => {
                debug!("mined block is stale: {e}");
                self.restore_transactions(transactions);
                false
            }
        }
    }

    pub fn restore_transactions(&mut self, transactions: Vec<Transaction>) {
        self.pool.restore(transactions);
    }

    /// Prepare, solve and commit in one call, blocking on proof-of-work.
    pub fn mine(&mut self, miner: &str) -> Option<Block> {
        let mut candidate = self.prepare_candidate(miner)?;
        let (_, hash) = pow::solve(&mut candidate, self.difficulty());
        if !self.commit_mined(candidate, &hash) {
            return None;
        }
        self.chain.last_block().cloned()
    }

    /// Replaces the chain wholesale when `candidate` is strictly longer.
    /// Orphaned local blocks are not salvaged.
    pub fn adopt_if_longer(&mut self, candidate: Chain) -> bool {
        if candidate.len() <= self.chain.len() || candidate.difficulty() != self.difficulty() {
            return false;
        }
        info!(
            "replacing chain of length {} with length {}",
            self.chain.len(),
            candidate.len()
        );
        self.chain = candidate;
        true
    }

    /// Unconditional wholesale swap, used when joining the network.
    pub fn replace_chain(&mut self, chain: Chain) {
        self.chain = chain;
    }

    /// Whether `block` still sits at its position in the local chain.
    pub fn holds_block(&self, block: &Block) -> bool {
        self.chain
            .block(block.index)
            .is_some_and(|b| b.hash == block.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RejectReason;

    const D: u32 = 1;

    fn ledger_with_blocks(n: usize, author: &str) -> Ledger {
        let mut ledger = Ledger::new(D);
        for i in 0..n {
            ledger.submit_transaction(author, &format!("tx {i}")).unwrap();
            ledger.mine("m").unwrap();
        }
        ledger
    }

    #[test]
    fn mine_is_noop_on_empty_pool() {
        let mut ledger = Ledger::new(D);
        assert!(ledger.mine("minerX").is_none());
        assert_eq!(ledger.chain().len(), 1);
    }

    #[test]
    fn submit_then_mine_scenario() {
        let mut ledger = Ledger::new(D);
        let prior_tip = ledger.chain().tip_hash().to_string();
        ledger.submit_transaction("alice", "hello").unwrap();

        let block = ledger.mine("minerX").unwrap();

        assert!(ledger.pool().is_empty());
        assert_eq!(ledger.chain().len(), 2);
        assert_eq!(block.previous_hash, prior_tip);
        assert_eq!(block.miner, "minerX");
        assert_eq!(block.transactions.len(), 1);
        let tx = &block.transactions[0];
        assert_eq!((tx.author.as_str(), tx.content.as_str()), ("alice", "hello"));
        assert_eq!(tx.hash, Transaction::content_hash("alice", "hello", tx.timestamp));
        assert!(Chain::validate(ledger.chain().blocks(), D));
    }

    #[test]
    fn candidate_owns_its_transactions() {
        let mut ledger = Ledger::new(D);
        ledger.submit_transaction("alice", "one").unwrap();
        let candidate = ledger.prepare_candidate("m").unwrap();
        ledger.submit_transaction("bob", "two").unwrap();
        assert_eq!(candidate.transactions.len(), 1);
        assert_eq!(ledger.pool().len(), 1);
    }

    #[test]
    fn stale_candidate_returns_transactions_to_pool() {
        let mut ledger = Ledger::new(D);
        ledger.submit_transaction("alice", "mine me").unwrap();
        let mut candidate = ledger.prepare_candidate("m").unwrap();
        let (_, hash) = pow::solve(&mut candidate, D);

        // A peer's block lands first.
        let mut competing = Block::new(1, vec![], ledger.chain().tip_hash(), D, "peer");
        let (_, competing_hash) = pow::solve(&mut competing, D);
        competing.hash = competing_hash;
        ledger.receive_block(competing).unwrap();

        assert!(!ledger.commit_mined(candidate.clone(), &hash));
        assert_eq!(ledger.chain().len(), 2);
        assert!(!ledger.holds_block(&Block { hash, ..candidate }));
        assert_eq!(ledger.pool().pending()[0].content, "mine me");
    }

    #[test]
    fn receive_block_rejects_forged_hash() {
        let mut ledger = Ledger::new(D);
        let mut block = Block::new(1, vec![], ledger.chain().tip_hash(), D, "peer");
        pow::solve(&mut block, D);
        block.hash = format!("0{}", "e".repeat(63));
        assert!(matches!(
            ledger.receive_block(block),
            Err(LedgerError::RejectedBlock { index: 1, .. })
        ));
        assert_eq!(ledger.chain().len(), 1);
    }

    fn peer_block(index: u64, previous_hash: &str) -> Block {
        let mut block = Block::new(index, vec![], previous_hash, D, "peer");
        let (_, hash) = pow::solve(&mut block, D);
        block.hash = hash;
        block
    }

    #[test]
    fn receive_block_rejects_out_of_sequence_index() {
        let mut ledger = Ledger::new(D);
        let tip = ledger.chain().tip_hash().to_string();
        for index in [u64::MAX, 3, 2] {
            assert_eq!(
                ledger.receive_block(peer_block(index, &tip)),
                Err(LedgerError::RejectedBlock {
                    index,
                    reason: RejectReason::OutOfSequence
                })
            );
        }
        assert_eq!(ledger.chain().len(), 1);

        ledger.submit_transaction("alice", "still minable").unwrap();
        let mined = ledger.mine("m").unwrap();
        assert_eq!(mined.index, 1);
        assert!(ledger.holds_block(&mined));
    }

    #[test]
    fn adopt_only_strictly_longer() {
        let mut short = ledger_with_blocks(2, "alice");
        let long = ledger_with_blocks(4, "bob");

        assert!(!short.adopt_if_longer(Chain::create_genesis(D)));
        assert_eq!(short.chain().len(), 3);
        assert!(short.adopt_if_longer(long.chain().clone()));
        assert_eq!(short.chain().blocks(), long.chain().blocks());

        let mut long = long;
        assert!(!long.adopt_if_longer(ledger_with_blocks(4, "carol").chain().clone()));
    }

    #[test]
    fn holds_block_tracks_replacement() {
        let mut ledger = ledger_with_blocks(1, "alice");
        let mined = ledger.chain().last_block().unwrap().clone();
        assert!(ledger.holds_block(&mined));
        assert!(ledger.adopt_if_longer(ledger_with_blocks(3, "bob").chain().clone()));
        assert!(!ledger.holds_block(&mined));
    }

    #[test]
    fn snapshot_carries_peers() {
        let mut ledger = Ledger::new(D);
        ledger.register_peer("http://a").unwrap();
        ledger.merge_peers(["http://b", "http://a"]);
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.length, 1);
        assert_eq!(snapshot.peer_list, vec!["http://a", "http://b"]);
    }
}
