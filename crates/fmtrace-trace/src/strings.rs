//! String chunk extraction.
//!
//! The decompiler tags records holding encrypted text with a fixed marker in
//! the reference slot (`Some(16)` in the traces seen so far). Their payloads
//! decrypt through the filtered cipher mode.

use crate::format::TraceRecord;
use fmtrace_core::{CipherMode, StringCipher};
use std::fmt;
use tracing::debug;

/// Reference value marking string chunks.
pub const DEFAULT_STRING_MARKER: &str = "Some(16)";

/// Bytes of a string chunk that precede its text.
const STRING_HEADER_LEN: usize = 12;

/// A decrypted string and the path it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedString {
    /// Record path.
    pub path: String,
    /// Decrypted, printable-only text.
    pub text: String,
}

impl fmt::Display for DecodedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.text)
    }
}

/// Picks string chunks out of a record stream and decrypts them.
#[derive(Clone, Debug)]
pub struct StringExtractor {
    cipher: StringCipher,
    marker: String,
}

impl StringExtractor {
    /// Extractor matching `marker` and decrypting with `cipher`.
    #[must_use]
    pub fn new(cipher: StringCipher, marker: impl Into<String>) -> Self {
        Self {
            cipher,
            marker: marker.into(),
        }
    }

    /// Standard cipher and [`DEFAULT_STRING_MARKER`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(StringCipher::standard(), DEFAULT_STRING_MARKER)
    }

    /// Whether `rec` is a string chunk.
    #[must_use]
    pub fn matches(&self, rec: &TraceRecord) -> bool {
        rec.reference == self.marker
    }

    /// Decrypt `rec` if it is a string chunk.
    #[must_use]
    pub fn extract(&self, rec: &TraceRecord) -> Option<DecodedString> {
        if !self.matches(rec) {
            return None;
        }
        let text = self.cipher.decrypt(&rec.payload_bytes, CipherMode::Filtered);
        debug!(
            path = %rec.path,
            payload = rec.payload_bytes.len(),
            text_len = rec.payload_bytes.len().saturating_sub(STRING_HEADER_LEN),
            "string chunk"
        );
        Some(DecodedString {
            path: rec.path.clone(),
            text,
        })
    }
}

impl Default for StringExtractor {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_marked_records_decode() {
        let x = StringExtractor::standard();
        // "oi" under the mask, then a 116 ('.') and 219 ("..").
        let rec = TraceRecord::new("t/3", 0x07, "Some(16)", vec![0x35, 0x33, 116, 219], 4);
        let got = x.extract(&rec).unwrap();
        assert_eq!(got.text, "oi...");
        assert_eq!(got.to_string(), "t/3: oi...");

        let other = TraceRecord::new("t/3", 0x07, "16", vec![0x32], 1);
        assert!(x.extract(&other).is_none());
    }

    #[test]
    fn byte_50_vanishes_mid_payload() {
        let x = StringExtractor::standard();
        let rec = TraceRecord::new("t/4", 0x07, "Some(16)", vec![0x35, 50, 50, 0x33], 4);
        assert_eq!(x.extract(&rec).unwrap().text, "oi");
    }

    #[test]
    fn custom_marker() {
        let x = StringExtractor::new(StringCipher::standard(), "str");
        let rec = TraceRecord::new("p", 0x07, "str", vec![50], 1);
        assert_eq!(x.extract(&rec).unwrap().text, "");
    }
}
