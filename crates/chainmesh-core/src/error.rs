use thiserror::Error;

/// Every way the ledger can refuse an input. None of these are fatal to the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid transaction data: author and content are required")]
    InvalidTransaction,

    #[error("Invalid data: node address is required")]
    InvalidPeerAddress,

    #[error("block {index} rejected: {reason}")]
    RejectedBlock { index: u64, reason: RejectReason },

    #[error("The chain dump has been tampered with! (first bad record at position {index})")]
    TamperedChain { index: usize },

    #[error("chain dump contains no blocks")]
    EmptyChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("previous_hash does not match the current tip")]
    BrokenContinuity,

    #[error("index does not follow the current tip")]
    OutOfSequence,

    #[error("claimed hash does not satisfy the difficulty target")]
    InsufficientWork,

    #[error("claimed hash does not match the block contents")]
    HashMismatch,
}
