//! Bit-level view of byte blocks.
//!
//! Blocks are read most-significant-bit first: bit index 0 is the top bit of
//! byte 0, bit index 7 its bottom bit, bit index 8 the top bit of byte 1, and
//! so on. Every other module addresses bits through this ordering.

use crate::ecc::Result;
use crate::error::Error;
use bitvec::prelude::*;

/// Owned, MSB-first bit representation of a block.
pub type Bits = BitVec<u8, Msb0>;

/// Number of data bits carried by a block of `size` bytes.
pub fn bit_len(size: usize) -> Result<usize> {
    size.checked_mul(8).ok_or_else(|| {
        Error::InvalidInput(format!("block of {} bytes is too large", size))
    })
}

/// Copies `block` into an owned bit buffer.
///
/// The buffer is reserved up front; if that fails the call returns
/// [`Error::AllocationFailure`] instead of aborting.
pub fn to_bits(block: &[u8]) -> Result<Bits> {
    let bits = bit_len(block.len())?;
    let mut raw = Vec::new();
    raw.try_reserve_exact(block.len())
        .map_err(|_| Error::AllocationFailure { bits })?;
    raw.extend_from_slice(block);
    Ok(BitVec::from_vec(raw))
}

/// Flips the bit at `index` (MSB-first) in place.
pub fn flip_bit(block: &mut [u8], index: usize) -> Result<()> {
    let bits = block.view_bits_mut::<Msb0>();
    if index >= bits.len() {
        return Err(Error::InvalidInput(format!(
            "bit index {} out of range for {}-bit block",
            index,
            bits.len()
        )));
    }
    let old = bits[index];
    bits.set(index, !old);
    Ok(())
}

/// Renders a block as space separated `0`/`1` characters, for log output.
pub fn bit_string(block: &[u8]) -> String {
    let bits = block.view_bits::<Msb0>();
    let mut out = String::with_capacity(bits.len() * 2);
    for (i, bit) in bits.iter().by_vals().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(if bit { '1' } else { '0' });
    }
    out
}
