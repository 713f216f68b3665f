//! fmtrace-core — leaf codecs for decompiler trace payloads.
//!
//! This crate holds the small, stateless pieces the trace pipeline leans on:
//! - [`int`]: big-endian variable-width integer decoding (1, 2 or 4 bytes),
//! - [`cipher`]: the substitution + XOR string cipher (filtered and legacy),
//! - [`error`]: typed error kinds shared with the trace crate.
//!
//! ```
//! use fmtrace_core::{decode_int, CipherMode, StringCipher};
//!
//! assert_eq!(decode_int(&[0x01, 0x00])?, 256);
//! let cipher = StringCipher::standard();
//! assert_eq!(cipher.decrypt(&[0x32, 0x3f], CipherMode::Legacy), "he");
//! # Ok::<(), fmtrace_core::DecodeError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::module_name_repetitions, clippy::doc_markdown)]

/// Substitution + XOR string cipher.
pub mod cipher;
/// Typed error kinds for decoding, parsing and ciphering.
pub mod error;
/// Big-endian variable-width integer codec.
pub mod int;

pub use cipher::*;
pub use error::*;
pub use int::*;
