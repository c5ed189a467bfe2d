//! Hamming single-error-correcting code for memory blocks.
//!
//! A block of `m` data bits is laid out, conceptually, on the 1-based
//! positions `1..=m + r` of a classic Hamming code word: positions that are
//! powers of two hold the `r` check bits, every other position holds the next
//! data bit. The check bits are never written into the block. Instead the
//! encoder XORs together the positions of all set data bits and keeps that
//! value, the parity word, in a [`ParityLedger`] next to the block.
//!
//! On read the same walk is repeated over the block as it is now and XORed
//! with the stored parity word. The result is the syndrome:
//!
//! - `0` means the data bits are consistent with the stored parity
//! - a non power of two names the position of a single flipped data bit,
//!   which is mapped back to a data bit index and flipped in place
//! - a power of two lands on a check-bit slot. Parity words are never
//!   corrupted (injectors only touch blocks), so this can only come from two
//!   or more flipped data bits; it is reported as a multi-bit error and the
//!   data is left alone
//!
//! # Limitations
//!
//! This is a plain (non-extended) Hamming code. It corrects exactly one
//! flipped bit per block. Two flips produce a nonzero syndrome that points
//! at some third bit, which is then "corrected" and leaves the block more
//! damaged than before (unless it lands on a check-bit slot or past the last
//! data bit, in which case nothing is flipped); an even number of flips can also cancel out to a
//! zero syndrome and go unnoticed. Callers that need double-error detection
//! must layer it on top.
//!
//! # Examples
//!
//! ```
//! use memecc::ecc::hamming::{DecodeOutcome, HammingCodec};
//! use memecc::ecc::ledger::{BlockId, ParityLedger};
//!
//! let codec = HammingCodec::new();
//! let mut ledger = ParityLedger::new();
//! let mut block = [0u8, 11, 4, 60];
//!
//! codec.encode(BlockId(1), &block, &mut ledger).unwrap();
//! block[0] ^= 0x01;
//!
//! let outcome = codec.decode(BlockId(1), &mut block, &ledger).unwrap();
//! assert_eq!(outcome, DecodeOutcome::Corrected { bit: 7 });
//! assert_eq!(block, [0, 11, 4, 60]);
//! ```

use crate::ecc::bits;
use crate::ecc::ledger::{BlockId, ParityEntry, ParityLedger, ParityWord};
use crate::ecc::Result;
use crate::error::Error;
use bitvec::prelude::*;
use log::{debug, warn};

/// Smallest `r` with `2^r >= m + r + 1`: the number of check bits needed to
/// protect `m` data bits.
pub fn find_min_r(m: usize) -> u32 {
    let m = m as u128;
    let mut r = 0u32;
    while (1u128 << r) < m + r as u128 + 1 {
        r += 1;
    }
    r
}

/// The 1-based code word positions that carry data bits, in order.
fn data_positions() -> impl Iterator<Item = u64> {
    (1u64..).filter(|p| !p.is_power_of_two())
}

/// XOR of the positions of every set bit in `bits`.
fn accumulate(bits: &BitSlice<u8, Msb0>) -> u64 {
    bits.iter()
        .by_vals()
        .zip(data_positions())
        .filter(|&(bit, _)| bit)
        .fold(0, |acc, (_, position)| acc ^ position)
}

/// Maps a code word position back to the index of the data bit stored there.
///
/// Returns `None` for `0` and for powers of two, which are check-bit slots.
/// Position `p` has `floor(log2 p) + 1` check-bit slots at or below it, so
/// its data index is `p - (floor(log2 p) + 1) - 1`.
pub fn data_index_for_syndrome(syndrome: u64) -> Option<usize> {
    if syndrome == 0 || syndrome.is_power_of_two() {
        return None;
    }
    let index = syndrome - u64::from(syndrome.ilog2()) - 2;
    usize::try_from(index).ok()
}

/// Computes the parity word of a non-empty block.
pub fn parity_word(block: &[u8]) -> Result<ParityWord> {
    if block.is_empty() {
        return Err(Error::InvalidInput(
            "cannot compute parity of an empty block".to_string(),
        ));
    }
    let bits = bits::to_bits(block)?;
    Ok(ParityWord(accumulate(&bits)))
}

/// What a decode found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Syndrome was zero; the block was not touched.
    Clean,
    /// The data bit at `bit` (MSB-first index) was flipped back.
    ///
    /// With more than one corrupted bit this may be the wrong bit.
    Corrected { bit: usize },
    /// The syndrome is a power of two, which no single data-bit flip can
    /// produce: at least two data bits are corrupt. The data was left
    /// unchanged.
    MultiBitDetected { syndrome: u64 },
    /// The syndrome points past the last data bit, which only multiple flips
    /// can cause; the data was left unchanged.
    Unlocatable { syndrome: u64 },
}

impl DecodeOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, DecodeOutcome::Clean)
    }

    pub fn corrected_bit(&self) -> Option<usize> {
        match self {
            DecodeOutcome::Corrected { bit } => Some(*bit),
            _ => None,
        }
    }
}

/// Encoder/decoder for the ledger-backed Hamming scheme.
///
/// The codec holds no state of its own; parity words live in whatever
/// [`ParityLedger`] the caller passes in.
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingCodec;

impl HammingCodec {
    /// Creates a codec.
    ///
    /// # Returns
    ///
    /// A stateless `HammingCodec`; it can be shared freely between ledgers.
    pub fn new() -> Self {
        HammingCodec
    }

    /// Number of check bits covering a block of `size` bytes.
    pub fn check_bits(&self, size: usize) -> Result<u32> {
        Ok(find_min_r(bits::bit_len(size)?))
    }

    /// Computes the parity word of `block` and records it under `id`,
    /// replacing any earlier entry for that id.
    ///
    /// # Arguments
    ///
    /// * `id` - Block the parity word belongs to
    /// * `block` - Data to protect; must not be empty
    /// * `ledger` - Where the parity word and block length are recorded
    ///
    /// # Returns
    ///
    /// The parity word that was recorded, or an error for an empty block
    pub fn encode(
        &self,
        id: BlockId,
        block: &[u8],
        ledger: &mut ParityLedger,
    ) -> Result<ParityWord> {
        let parity = parity_word(block)?;
        debug!(
            "encoded block {} ({} bytes): parity word {}",
            id,
            block.len(),
            parity
        );
        ledger.record(
            id,
            ParityEntry {
                parity,
                size: block.len(),
            },
        );
        Ok(parity)
    }

    /// Syndrome of `block` against a previously stored parity word.
    ///
    /// Only the low `r` bits of `stored` take part, `r` being the check-bit
    /// count for the block length.
    pub fn syndrome(&self, block: &[u8], stored: ParityWord) -> Result<u64> {
        let observed = parity_word(block)?;
        let r = self.check_bits(block.len())?;
        Ok(observed.value() ^ stored.masked(r))
    }

    /// Checks `block` against `stored` and repairs a single flipped bit in
    /// place.
    ///
    /// # Arguments
    ///
    /// * `block` - Data as read back, possibly corrupted
    /// * `stored` - Parity word computed when the block was encoded
    ///
    /// # Returns
    ///
    /// What was found; only [`DecodeOutcome::Corrected`] modifies `block`
    pub fn correct(&self, block: &mut [u8], stored: ParityWord) -> Result<DecodeOutcome> {
        let syndrome = self.syndrome(block, stored)?;
        if syndrome == 0 {
            return Ok(DecodeOutcome::Clean);
        }

        let data_bits = bits::bit_len(block.len())?;
        match data_index_for_syndrome(syndrome) {
            None => {
                warn!(
                    "syndrome {} is a power of two: multiple bits flipped, data left unchanged",
                    syndrome
                );
                Ok(DecodeOutcome::MultiBitDetected { syndrome })
            }
            Some(bit) if bit >= data_bits => {
                warn!(
                    "syndrome {} is beyond the {} data bits; data left unchanged",
                    syndrome, data_bits
                );
                Ok(DecodeOutcome::Unlocatable { syndrome })
            }
            Some(bit) => {
                bits::flip_bit(block, bit)?;
                warn!(
                    "syndrome {}: corrected bit {} of byte {}",
                    syndrome,
                    7 - bit % 8,
                    bit / 8
                );
                Ok(DecodeOutcome::Corrected { bit })
            }
        }
    }

    /// Looks up the parity recorded for `id` and corrects `block` against it.
    ///
    /// # Arguments
    ///
    /// * `id` - Block to look up in `ledger`
    /// * `block` - Data as read back; corrected in place
    /// * `ledger` - Ledger populated by an earlier [`encode`](Self::encode)
    ///
    /// # Returns
    ///
    /// The [`DecodeOutcome`] of checking the block.
    ///
    /// Fails with [`Error::MissingParity`] when `id` was never encoded and
    /// with [`Error::BlockSizeMismatch`] when `block` has a different length
    /// than at encode time; in both cases the block is untouched.
    pub fn decode(
        &self,
        id: BlockId,
        block: &mut [u8],
        ledger: &ParityLedger,
    ) -> Result<DecodeOutcome> {
        let entry = ledger.lookup(id)?;
        if entry.size != block.len() {
            return Err(Error::BlockSizeMismatch {
                id,
                encoded: entry.size,
                decoded: block.len(),
            });
        }
        debug!(
            "decoding block {} against parity word {}: {}",
            id,
            entry.parity,
            bits::bit_string(block)
        );
        self.correct(block, entry.parity)
    }
}
