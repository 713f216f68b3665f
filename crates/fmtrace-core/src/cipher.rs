//! Substitution + XOR cipher used for text stored in trace payloads.
//!
//! Two decryption modes exist:
//!
//! - [`CipherMode::Legacy`]: every byte is XORed with [`XOR_MASK`] and mapped
//!   to the character with that code. Nothing is dropped, so the mode inverts
//!   [`StringCipher::encrypt_legacy`] exactly.
//! - [`CipherMode::Filtered`]: each byte is first expanded through a
//!   [`SubstitutionTable`] (zero or more pre-mask bytes), then masked, and
//!   only printable characters are kept. This is lossy.
//!
//! Characters are produced from single bytes, i.e. U+0000..=U+00FF.

use crate::error::CipherError;

/// XOR mask applied to every byte after substitution.
pub const XOR_MASK: u8 = 0x5A;

/// Substitutions of the standard table, expressed as pre-mask bytes.
///
/// `218` yields `'u'` after masking, so its entry is stored pre-masked.
const STANDARD_SUBSTITUTIONS: &[(u8, &[u8])] = &[
    (50, &[]),
    (65, &[58 ^ XOR_MASK]),
    (116, &[46 ^ XOR_MASK]),
    (218, &[117 ^ XOR_MASK]),
    (219, &[46 ^ XOR_MASK, 46 ^ XOR_MASK]),
];

/// Decryption policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CipherMode {
    /// Plain XOR, no substitution, no filtering.
    Legacy,
    /// Substitution table, XOR, then drop non-printable characters.
    Filtered,
}

/// Finite mapping from an input byte to zero or more pre-mask bytes.
///
/// Bytes without an explicit entry expand to themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionTable {
    expansions: Vec<Vec<u8>>,
}

impl SubstitutionTable {
    /// Build a table from explicit `(byte, expansion)` entries.
    ///
    /// Later entries for the same byte replace earlier ones.
    #[must_use]
    pub fn new(entries: &[(u8, &[u8])]) -> Self {
        let mut expansions: Vec<Vec<u8>> = (0..=u8::MAX).map(|b| vec![b]).collect();
        for (byte, expansion) in entries {
            expansions[usize::from(*byte)] = expansion.to_vec();
        }
        Self { expansions }
    }

    /// The table used by the trace format's string chunks.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_SUBSTITUTIONS)
    }

    /// Pre-mask bytes for `byte`.
    #[inline]
    #[must_use]
    pub fn expand(&self, byte: u8) -> &[u8] {
        &self.expansions[usize::from(byte)]
    }
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// String cipher bound to one substitution table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringCipher {
    table: SubstitutionTable,
}

impl StringCipher {
    /// Cipher over an explicit substitution table.
    #[must_use]
    pub const fn new(table: SubstitutionTable) -> Self {
        Self { table }
    }

    /// Cipher over [`SubstitutionTable::standard`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(SubstitutionTable::standard())
    }

    /// Recover text from `bytes` under `mode`.
    #[must_use]
    pub fn decrypt(&self, bytes: &[u8], mode: CipherMode) -> String {
        match mode {
            CipherMode::Legacy => bytes.iter().map(|b| char::from(b ^ XOR_MASK)).collect(),
            CipherMode::Filtered => bytes
                .iter()
                .flat_map(|&b| self.table.expand(b).iter())
                .map(|b| char::from(b ^ XOR_MASK))
                .filter(|c| is_printable(*c))
                .collect(),
        }
    }

    /// Encrypt `text` so that [`CipherMode::Legacy`] decryption returns it.
    ///
    /// # Errors
    /// [`CipherError::Unrepresentable`] on the first character above U+00FF.
    pub fn encrypt_legacy(&self, text: &str) -> Result<Vec<u8>, CipherError> {
        text.chars()
            .map(|c| {
                u8::try_from(c)
                    .map(|b| b ^ XOR_MASK)
                    .map_err(|_| CipherError::Unrepresentable(c))
            })
            .collect()
    }
}

/// Printable in the Latin-1 range: no control characters, no NBSP, no soft hyphen.
#[inline]
fn is_printable(c: char) -> bool {
    !c.is_control() && c != '\u{a0}' && c != '\u{ad}'
}
