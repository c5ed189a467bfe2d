//! Single-error-correcting memory protection.
//!
//! This module provides the pieces a memory object needs to protect blocks
//! with a Hamming code whose check bits are kept out of band:
//! - `bits`: MSB-first bit view of byte blocks
//! - `hamming`: parity computation, syndrome and single-bit correction
//! - `ledger`: per-block store of parity words
//! - `fault`: pluggable bit-flip injectors for exercising the corrector
//! - `controller`: write/read path combining the above
//!
//! # Examples
//!
//! ```rust
//! use memecc::ecc::controller::{EccController, ReadOutcome};
//! use memecc::ecc::fault::CountdownInjector;
//! use memecc::ecc::hamming::DecodeOutcome;
//! use memecc::ecc::ledger::BlockId;
//!
//! let controller = EccController::with_injector(Box::new(CountdownInjector::new(1)));
//! let mut block = [0u8, 11, 4, 60];
//!
//! controller.on_write(BlockId(0x80), &mut block).unwrap();
//! assert_eq!(block, [1, 11, 4, 60]);
//!
//! let outcome = controller.on_read(BlockId(0x80), &mut block).unwrap();
//! assert_eq!(outcome, ReadOutcome::Decoded(DecodeOutcome::Corrected { bit: 7 }));
//! assert_eq!(block, [0, 11, 4, 60]);
//! ```

use crate::error::Error;

/// Result type for ECC operations
pub type Result<T> = std::result::Result<T, Error>;

pub mod bits;
pub mod controller;
pub mod fault;
pub mod hamming;
pub mod ledger;

pub use controller::{EccController, EccStats, ReadOutcome, WriteOutcome};
pub use fault::{CountdownInjector, FaultInjector, FaultRecord, NoFaults, ProbabilisticInjector};
pub use hamming::{find_min_r, parity_word, DecodeOutcome, HammingCodec};
pub use ledger::{BlockId, ParityEntry, ParityLedger, ParityWord};
