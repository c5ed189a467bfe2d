//! Error types for the memory ECC codec.

use crate::ecc::ledger::BlockId;
use thiserror::Error;

/// Errors raised by encode, decode and the memory-side controller.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied something the codec cannot work with (empty block, bad config).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The bit buffer for a block could not be reserved.
    #[error("failed to allocate bit buffer for {bits} bits")]
    AllocationFailure { bits: usize },

    /// Decode was asked for a block that has no recorded parity word.
    #[error("no parity word recorded for block {0}")]
    MissingParity(BlockId),

    /// The block being decoded is not the length it had when it was encoded.
    #[error("block {id} was encoded as {encoded} bytes but decoded as {decoded} bytes")]
    BlockSizeMismatch {
        id: BlockId,
        encoded: usize,
        decoded: usize,
    },

    /// A thread panicked while holding the ledger or injector lock.
    #[error("ecc state lock poisoned")]
    LockPoisoned,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
