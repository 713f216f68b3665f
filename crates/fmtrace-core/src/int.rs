//! Big-endian variable-width integers as they appear in trace payloads.
//!
//! Widths are 1, 2 or 4 bytes. The 4-byte form is composed from two 16-bit
//! halves (`hi << 16 | lo`) rather than read flat; both give the same value.

use crate::error::DecodeError;

/// Decode a big-endian unsigned integer of 1, 2 or 4 bytes.
///
/// # Errors
/// [`DecodeError::UnsupportedLength`] for any other length, including empty input.
pub fn decode_int(bytes: &[u8]) -> Result<u32, DecodeError> {
    match bytes {
        [b] => Ok(u32::from(*b)),
        [hi, lo] => Ok((u32::from(*hi) << 8) | u32::from(*lo)),
        [_, _, _, _] => Ok((decode_int(&bytes[0..2])? << 16) | decode_int(&bytes[2..4])?),
        _ => Err(DecodeError::UnsupportedLength(bytes.len())),
    }
}

/// Encode `n` as the 4-byte big-endian form accepted by [`decode_int`].
#[inline]
#[must_use]
pub const fn encode_int(n: u32) -> [u8; 4] {
    n.to_be_bytes()
}
