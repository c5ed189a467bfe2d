//! Out-of-band Hamming error correction for memory blocks.
//!
//! Blocks are encoded on write into a parity word that is kept in a ledger
//! keyed by block address; on read the block is checked against that word
//! and a single flipped bit is repaired in place.

pub mod config;
pub mod ecc;
pub mod error;

pub use config::{EccConfig, FaultPolicy};
pub use ecc::{BlockId, DecodeOutcome, EccController, HammingCodec, ParityLedger, ParityWord};
pub use error::{Error, Result};
