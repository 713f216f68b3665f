//! Error kinds raised by the leaf codecs and the trace line parser.
//!
//! All of these abort a run; the pipeline wraps them in `anyhow` context
//! carrying the file and line they came from.

use thiserror::Error;

/// Failure to decode a big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Only 1, 2 and 4 byte encodings exist.
    #[error("unsupported integer length {0} (expected 1, 2 or 4 bytes)")]
    UnsupportedLength(usize),
}

/// A trace line that does not fit the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line did not split into the expected number of `::` fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Fields a record must carry.
        expected: usize,
        /// Fields actually present.
        found: usize,
    },
    /// A field had no `key:value` separator.
    #[error("field {index} has no ':' separator")]
    MissingSeparator {
        /// Positional index of the offending field.
        index: usize,
    },
    /// The size field is not an unsigned decimal.
    #[error("invalid size {0:?}")]
    InvalidSize(String),
    /// The opcode field is not hexadecimal.
    #[error("invalid opcode {0:?}")]
    InvalidOpcode(String),
    /// A numeric payload token does not fit in a byte.
    #[error("payload value {0:?} does not fit in a byte")]
    ByteOutOfRange(String),
}

/// Failure to encrypt text with the legacy cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Characters above U+00FF have no single-byte form.
    #[error("character {0:?} is not representable as a single byte")]
    Unrepresentable(char),
}
