use crate::{LedgerError, Transaction};

/// Unconfirmed transactions in arrival order. No dedup, no priority.
#[derive(Clone, Debug, Default)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, author: &str, content: &str) -> Result<Transaction, LedgerError> {
        if author.is_empty() || content.is_empty() {
            return Err(LedgerError::InvalidTransaction);
        }
        let tx = Transaction::new(author, content);
        self.pending.push(tx.clone());
        Ok(tx)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Empties the pool in one step and hands back everything it held.
    pub fn take_all(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    /// Puts transactions from a block that never made it into the chain back in
    /// front of anything submitted since.
    pub fn restore(&mut self, mut txs: Vec<Transaction>) {
        txs.append(&mut self.pending);
        self.pending = txs;
    }
}
