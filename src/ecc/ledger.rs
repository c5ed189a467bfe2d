//! Per-block parity bookkeeping.
//!
//! The ledger remembers, for each block identifier, the parity word computed
//! the last time that block was encoded together with the block length. It
//! is consulted (never consumed) on every read.

use crate::ecc::Result;
use crate::error::Error;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Identifies the block a parity word belongs to.
///
/// Blocks are keyed by their memory address, so two writes to the same
/// address share one ledger slot and the later one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl BlockId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for BlockId {
    fn from(addr: u64) -> Self {
        BlockId(addr)
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// XOR of the interleaved positions of every set data bit.
///
/// Only the low `r` bits are meaningful, where `r` is the check-bit count for
/// the block length. 64 bits covers any block that fits in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParityWord(pub u64);

impl ParityWord {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The word restricted to its low `r` bits.
    pub fn masked(&self, r: u32) -> u64 {
        if r >= u64::BITS {
            self.0
        } else {
            self.0 & ((1u64 << r) - 1)
        }
    }
}

impl Display for ParityWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the ledger stores per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParityEntry {
    pub parity: ParityWord,
    /// Block length in bytes at encode time.
    pub size: usize,
}

/// Mapping from block identifier to the parity recorded at its last encode.
#[derive(Debug, Clone, Default)]
pub struct ParityLedger {
    entries: HashMap<BlockId, ParityEntry>,
}

impl ParityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry` for `id`.
    ///
    /// # Arguments
    ///
    /// * `id` - Block the entry belongs to
    /// * `entry` - Parity word and length from the latest encode
    ///
    /// # Returns
    ///
    /// The entry that was replaced, if `id` had one
    pub fn record(&mut self, id: BlockId, entry: ParityEntry) -> Option<ParityEntry> {
        self.entries.insert(id, entry)
    }

    pub fn get(&self, id: BlockId) -> Option<&ParityEntry> {
        self.entries.get(&id)
    }

    /// Like [`get`](Self::get) but reports an absent entry as
    /// [`Error::MissingParity`].
    pub fn lookup(&self, id: BlockId) -> Result<ParityEntry> {
        self.entries
            .get(&id)
            .copied()
            .ok_or(Error::MissingParity(id))
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Drops the entry for `id`. Nothing is ever evicted implicitly.
    pub fn remove(&mut self, id: BlockId) -> Option<ParityEntry> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
