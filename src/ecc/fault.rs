//! Fault injection for exercising the corrector.
//!
//! An injector is handed a block right after it has been encoded and may flip
//! one of its bits to simulate a transient memory error. Injectors only ever
//! see the data block, never the parity ledger.

use crate::ecc::Result;
use crate::error::Error;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A bit flipped by an injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRecord {
    /// Byte index within the block.
    pub byte: usize,
    /// Bit within that byte, 0 being the least significant.
    pub bit: u8,
}

impl FaultRecord {
    /// The same bit as an MSB-first index into the whole block.
    pub fn data_index(&self) -> usize {
        self.byte * 8 + (7 - self.bit as usize)
    }

    fn apply(&self, block: &mut [u8]) {
        block[self.byte] ^= 1 << self.bit;
    }
}

/// Strategy for corrupting blocks between encode and decode.
pub trait FaultInjector {
    /// Possibly flips one bit of `block`, reporting which.
    fn inject(&mut self, block: &mut [u8]) -> Option<FaultRecord>;
}

impl<F: FaultInjector + ?Sized> FaultInjector for Box<F> {
    fn inject(&mut self, block: &mut [u8]) -> Option<FaultRecord> {
        (**self).inject(block)
    }
}

/// Never corrupts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn inject(&mut self, _block: &mut [u8]) -> Option<FaultRecord> {
        None
    }
}

/// Flips a uniformly chosen bit with probability `1 / one_in` per call.
#[derive(Debug, Clone)]
pub struct ProbabilisticInjector {
    one_in: u32,
    rng: ChaCha20Rng,
}

impl ProbabilisticInjector {
    /// Default odds: one block in a hundred.
    pub const DEFAULT_ONE_IN: u32 = 100;

    /// Creates an injector.
    ///
    /// # Arguments
    ///
    /// * `one_in` - Denominator of the per-call fault probability
    /// * `seed` - Fixed seed for a reproducible fault sequence, or `None` for entropy
    ///
    /// # Returns
    ///
    /// The injector, or an error if `one_in` is zero
    pub fn new(one_in: u32, seed: Option<u64>) -> Result<Self> {
        if one_in == 0 {
            return Err(Error::InvalidInput(
                "fault probability denominator must be positive".to_string(),
            ));
        }
        let rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Ok(Self { one_in, rng })
    }

    pub fn one_in(&self) -> u32 {
        self.one_in
    }
}

impl FaultInjector for ProbabilisticInjector {
    fn inject(&mut self, block: &mut [u8]) -> Option<FaultRecord> {
        if block.is_empty() || !self.rng.gen_ratio(1, self.one_in) {
            return None;
        }
        let fault = FaultRecord {
            byte: self.rng.gen_range(0..block.len()),
            bit: self.rng.gen_range(0..8),
        };
        fault.apply(block);
        info!(
            "injected fault: flipped bit {} of byte {}",
            fault.bit, fault.byte
        );
        Some(fault)
    }
}

/// Counts calls down and flips bit 0 of byte 0 on the call that reaches zero.
///
/// The counter can be shared between injectors (or observed from outside)
/// through [`CountdownInjector::shared`]. Once it has reached zero it stays
/// there and no further faults are injected.
#[derive(Debug, Clone)]
pub struct CountdownInjector {
    remaining: Arc<AtomicU64>,
}

impl CountdownInjector {
    pub fn new(remaining: u64) -> Self {
        Self::shared(Arc::new(AtomicU64::new(remaining)))
    }

    pub fn shared(remaining: Arc<AtomicU64>) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }
}

impl FaultInjector for CountdownInjector {
    fn inject(&mut self, block: &mut [u8]) -> Option<FaultRecord> {
        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous != Ok(1) || block.is_empty() {
            return None;
        }
        let fault = FaultRecord { byte: 0, bit: 0 };
        fault.apply(block);
        info!("countdown expired: flipped bit 0 of byte 0");
        Some(fault)
    }
}
