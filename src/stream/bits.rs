//! Bounds-checked bit extraction from byte slices.
//!
//! All reads use big-endian bit order: bit offset 0 addresses the most
//! significant bit of byte 0, and multi-bit reads produce the integer formed
//! by the addressed bits in stream order. Every function validates the
//! requested range against the buffer before touching it and returns
//! [`crate::Error::OutOfBounds`] on any overrun, so malformed or truncated
//! input can never cause a read past the end of the backing data.

use crate::{Error::OutOfBounds, Result};

/// Maximum number of bits a single [`read_bits_at`] call can return.
pub const MAX_BIT_READ: u64 = 64;

/// Read up to 64 bits at an arbitrary bit offset, MSB-first.
///
/// Returns the bits packed into the low end of a `u64`; a zero-bit read
/// yields 0.
///
/// # Errors
/// [`crate::Error::OutOfBounds`] if the addressed range extends past the end
/// of `data`, or a `Malformed` error when more than 64 bits are requested.
pub fn read_bits_at(data: &[u8], bit_offset: u64, count: u64) -> Result<u64> {
    if count == 0 {
        return Ok(0);
    }
    if count > MAX_BIT_READ {
        return Err(malformed_error!(
            "Scalar bit read of {} bits exceeds the 64 bit limit",
            count
        ));
    }

    let end = bit_offset.checked_add(count).ok_or(OutOfBounds)?;
    if end > (data.len() as u64) * 8 {
        return Err(OutOfBounds);
    }

    let first = (bit_offset / 8) as usize;
    let last = ((end - 1) / 8) as usize;

    // At most 9 bytes are touched for a 64-bit unaligned read, so a u128
    // accumulator always has room.
    let mut acc: u128 = 0;
    for byte in &data[first..=last] {
        acc = (acc << 8) | u128::from(*byte);
    }

    let total_bits = ((last - first + 1) * 8) as u64;
    let shift = total_bits - (bit_offset % 8) - count;

    let mask = if count == 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    };

    Ok(((acc >> shift) as u64) & mask)
}

/// Read `count` whole bytes starting at an arbitrary bit offset.
///
/// Byte-aligned offsets take a plain copy; unaligned offsets shift each byte
/// out of the two bytes it straddles.
///
/// # Errors
/// [`crate::Error::OutOfBounds`] if the addressed range extends past the end
/// of `data`.
pub fn read_bytes_at(data: &[u8], bit_offset: u64, count: usize) -> Result<Vec<u8>> {
    let bit_len = (count as u64).checked_mul(8).ok_or(OutOfBounds)?;
    let end = bit_offset.checked_add(bit_len).ok_or(OutOfBounds)?;
    if end > (data.len() as u64) * 8 {
        return Err(OutOfBounds);
    }

    if bit_offset % 8 == 0 {
        let start = (bit_offset / 8) as usize;
        return Ok(data[start..start + count].to_vec());
    }

    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let value = read_bits_at(data, bit_offset + (index as u64) * 8, 8)?;
        out.push(value as u8);
    }
    Ok(out)
}
