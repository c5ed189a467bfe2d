//! Memory-side ECC controller.
//!
//! Ties the codec, the parity ledger and a fault injector into the two calls
//! a memory object makes: [`EccController::on_write`] before a block is sent
//! to memory and [`EccController::on_read`] when a block comes back.
//!
//! The controller can be shared between threads. The ledger sits behind an
//! `RwLock` and the injector behind a `Mutex`; each critical section is a
//! single encode or decode.

use crate::config::EccConfig;
use crate::ecc::fault::{FaultInjector, FaultRecord, NoFaults};
use crate::ecc::hamming::{DecodeOutcome, HammingCodec};
use crate::ecc::ledger::{BlockId, ParityEntry, ParityLedger, ParityWord};
use crate::ecc::Result;
use crate::error::Error;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Result of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub parity: ParityWord,
    /// Bit the injector flipped after encoding, if any.
    pub fault: Option<FaultRecord>,
}

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No parity was recorded for the block; it was passed through untouched.
    Untracked,
    /// The block was checked against its recorded parity.
    Decoded(DecodeOutcome),
}

/// Snapshot of the controller's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EccStats {
    pub writes: u64,
    pub reads: u64,
    pub untracked_reads: u64,
    pub corrections: u64,
    pub injected_faults: u64,
}

#[derive(Debug, Default)]
struct Counters {
    writes: AtomicU64,
    reads: AtomicU64,
    untracked_reads: AtomicU64,
    corrections: AtomicU64,
    injected_faults: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> EccStats {
        EccStats {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            untracked_reads: self.untracked_reads.load(Ordering::Relaxed),
            corrections: self.corrections.load(Ordering::Relaxed),
            injected_faults: self.injected_faults.load(Ordering::Relaxed),
        }
    }
}

/// Write/read path for ECC-protected blocks.
///
/// Owns the parity ledger and the fault injector; every write records a
/// parity word and every read of a tracked block is checked against it.
pub struct EccController {
    codec: HammingCodec,
    ledger: RwLock<ParityLedger>,
    injector: Mutex<Box<dyn FaultInjector + Send>>,
    reject_untracked_reads: bool,
    counters: Counters,
}

impl EccController {
    /// Builds a controller from `config`, including its fault injector.
    ///
    /// # Arguments
    ///
    /// * `config` - Fault policy and untracked-read handling
    ///
    /// # Returns
    ///
    /// A controller with an empty ledger, or an error for an invalid config
    pub fn new(config: &EccConfig) -> Result<Self> {
        config.validate()?;
        let injector = config.build_injector()?;
        let mut controller = Self::with_injector(injector);
        controller.reject_untracked_reads = config.reject_untracked_reads;
        Ok(controller)
    }

    /// Builds a controller around a caller-supplied injector.
    pub fn with_injector(injector: Box<dyn FaultInjector + Send>) -> Self {
        Self {
            codec: HammingCodec::new(),
            ledger: RwLock::new(ParityLedger::new()),
            injector: Mutex::new(injector),
            reject_untracked_reads: false,
            counters: Counters::default(),
        }
    }

    /// Encodes `block`, records its parity under `id`, then lets the injector
    /// at it.
    pub fn on_write(&self, id: BlockId, block: &mut [u8]) -> Result<WriteOutcome> {
        let parity = {
            let mut ledger = self.ledger.write().map_err(|_| Error::LockPoisoned)?;
            self.codec.encode(id, block, &mut ledger)?
        };
        Counters::bump(&self.counters.writes);

        let fault = self
            .injector
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .inject(block);
        if fault.is_some() {
            Counters::bump(&self.counters.injected_faults);
        }
        Ok(WriteOutcome { parity, fault })
    }

    /// Checks and, if needed, repairs `block` against the parity recorded
    /// for `id`.
    ///
    /// A block that was never written through this controller is passed
    /// through as [`ReadOutcome::Untracked`], or rejected with
    /// [`Error::MissingParity`] when the controller was configured with
    /// `reject_untracked_reads`.
    pub fn on_read(&self, id: BlockId, block: &mut [u8]) -> Result<ReadOutcome> {
        let ledger = self.ledger.read().map_err(|_| Error::LockPoisoned)?;
        Counters::bump(&self.counters.reads);

        if !ledger.contains(id) {
            Counters::bump(&self.counters.untracked_reads);
            if self.reject_untracked_reads {
                return Err(Error::MissingParity(id));
            }
            debug!("read of untracked block {} passed through", id);
            return Ok(ReadOutcome::Untracked);
        }

        let outcome = self.codec.decode(id, block, &ledger)?;
        if outcome.corrected_bit().is_some() {
            Counters::bump(&self.counters.corrections);
        }
        Ok(ReadOutcome::Decoded(outcome))
    }

    /// Drops the parity recorded for `id`, returning it.
    pub fn forget(&self, id: BlockId) -> Result<Option<ParityEntry>> {
        let mut ledger = self.ledger.write().map_err(|_| Error::LockPoisoned)?;
        Ok(ledger.remove(id))
    }

    pub fn parity_of(&self, id: BlockId) -> Result<Option<ParityWord>> {
        let ledger = self.ledger.read().map_err(|_| Error::LockPoisoned)?;
        Ok(ledger.get(id).map(|entry| entry.parity))
    }

    pub fn tracked_blocks(&self) -> Result<usize> {
        let ledger = self.ledger.read().map_err(|_| Error::LockPoisoned)?;
        Ok(ledger.len())
    }

    pub fn stats(&self) -> EccStats {
        self.counters.snapshot()
    }
}

impl Default for EccController {
    fn default() -> Self {
        Self::with_injector(Box::new(NoFaults))
    }
}

impl std::fmt::Debug for EccController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EccController")
            .field("reject_untracked_reads", &self.reject_untracked_reads)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultPolicy;
    use crate::ecc::fault::CountdownInjector;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_write_then_read_clean() {
        let controller = EccController::default();
        let mut block = [0u8, 11, 4, 60];

        let written = controller.on_write(BlockId(0x100), &mut block).unwrap();
        assert_eq!(written.parity, ParityWord(12));
        assert_eq!(written.fault, None);

        let read = controller.on_read(BlockId(0x100), &mut block).unwrap();
        assert_eq!(read, ReadOutcome::Decoded(DecodeOutcome::Clean));
        assert_eq!(block, [0, 11, 4, 60]);
    }

    #[test]
    fn test_injected_fault_is_corrected_on_read() {
        let controller = EccController::with_injector(Box::new(CountdownInjector::new(1)));
        let mut block = [0u8, 11, 4, 60];

        let written = controller.on_write(BlockId(0x40), &mut block).unwrap();
        assert_eq!(written.fault, Some(FaultRecord { byte: 0, bit: 0 }));
        assert_eq!(block, [1, 11, 4, 60]);

        let read = controller.on_read(BlockId(0x40), &mut block).unwrap();
        assert_eq!(
            read,
            ReadOutcome::Decoded(DecodeOutcome::Corrected { bit: 7 })
        );
        assert_eq!(block, [0, 11, 4, 60]);

        let stats = controller.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.injected_faults, 1);
        assert_eq!(stats.corrections, 1);
    }

    #[test]
    fn test_untracked_read_passes_through() {
        let controller = EccController::default();
        let mut block = [9u8, 9];
        let read = controller.on_read(BlockId(1), &mut block).unwrap();
        assert_eq!(read, ReadOutcome::Untracked);
        assert_eq!(block, [9, 9]);
        assert_eq!(controller.stats().untracked_reads, 1);
    }

    #[test]
    fn test_untracked_read_rejected_when_configured() {
        let config = EccConfig {
            reject_untracked_reads: true,
            ..EccConfig::default()
        };
        let controller = EccController::new(&config).unwrap();
        let mut block = [9u8];
        assert!(matches!(
            controller.on_read(BlockId(2), &mut block),
            Err(Error::MissingParity(BlockId(2)))
        ));
    }

    #[test]
    fn test_forget_untracks_block() {
        let controller = EccController::default();
        let mut block = [1u8, 2];
        controller.on_write(BlockId(8), &mut block).unwrap();
        assert_eq!(controller.tracked_blocks().unwrap(), 1);

        let entry = controller.forget(BlockId(8)).unwrap().unwrap();
        assert_eq!(entry.size, 2);
        assert_eq!(controller.parity_of(BlockId(8)).unwrap(), None);
        assert_eq!(
            controller.on_read(BlockId(8), &mut block).unwrap(),
            ReadOutcome::Untracked
        );
    }

    #[test]
    fn test_rewrite_replaces_parity() {
        let controller = EccController::default();
        let mut first = [0xAAu8, 0xBB];
        let mut second = [0x01u8, 0x80];
        controller.on_write(BlockId(3), &mut first).unwrap();
        controller.on_write(BlockId(3), &mut second).unwrap();
        assert_eq!(controller.tracked_blocks().unwrap(), 1);

        second[1] ^= 0x80;
        controller.on_read(BlockId(3), &mut second).unwrap();
        assert_eq!(second, [0x01, 0x80]);
    }

    #[test]
    fn test_new_with_countdown_policy() {
        let config = EccConfig {
            fault: FaultPolicy::Countdown { remaining: 2 },
            ..EccConfig::default()
        };
        let controller = EccController::new(&config).unwrap();

        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        assert_eq!(controller.on_write(BlockId(0), &mut a).unwrap().fault, None);
        assert!(controller.on_write(BlockId(4), &mut b).unwrap().fault.is_some());

        controller.on_read(BlockId(0), &mut a).unwrap();
        controller.on_read(BlockId(4), &mut b).unwrap();
        assert_eq!(a, [0; 4]);
        assert_eq!(b, [0; 4]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EccConfig {
            fault: FaultPolicy::Probabilistic {
                one_in: 0,
                seed: None,
            },
            ..EccConfig::default()
        };
        assert!(matches!(
            EccController::new(&config),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_concurrent_blocks() {
        let controller = Arc::new(EccController::default());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let controller = Arc::clone(&controller);
                thread::spawn(move || {
                    for i in 0..50u64 {
                        let id = BlockId(t * 1000 + i);
                        let original = [t as u8, i as u8, 0x5A, 0xA5];
                        let mut block = original;
                        controller.on_write(id, &mut block).unwrap();
                        block[(i % 4) as usize] ^= 1 << (i % 8);
                        controller.on_read(id, &mut block).unwrap();
                        assert_eq!(block, original);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = controller.stats();
        assert_eq!(stats.writes, 400);
        assert_eq!(stats.corrections, 400);
        assert_eq!(controller.tracked_blocks().unwrap(), 400);
    }
}
