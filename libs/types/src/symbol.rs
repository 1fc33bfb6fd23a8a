//! Bounded inline ticker symbols
//!
//! Symbols are stored inline as up to 8 NUL-padded ASCII bytes so they can be
//! copied, hashed, and compared without heap allocation. Longer inputs are
//! rejected at the boundary rather than silently truncated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum symbol length in bytes (inline storage bound)
pub const SYMBOL_LENGTH: usize = 8;

/// Errors from symbol construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,

    #[error("symbol exceeds {SYMBOL_LENGTH} bytes: {0}")]
    TooLong(String),

    #[error("symbol contains non-ASCII or unprintable byte: {0}")]
    InvalidByte(String),
}

/// A ticker symbol stored inline (NUL-padded ASCII, 1..=8 bytes)
///
/// `Copy` by design: symbols are passed by value everywhere, including as
/// map keys in the façade's book registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; SYMBOL_LENGTH],
}

impl Symbol {
    /// Parse a symbol, validating length and character set
    ///
    /// Accepts ASCII graphic characters only (covers tickers like `BRK.B`).
    pub fn parse(s: &str) -> Result<Self, SymbolError> {
        if s.is_empty() {
            return Err(SymbolError::Empty);
        }
        if s.len() > SYMBOL_LENGTH {
            return Err(SymbolError::TooLong(s.to_string()));
        }
        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(SymbolError::InvalidByte(s.to_string()));
        }

        let mut bytes = [0u8; SYMBOL_LENGTH];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self { bytes })
    }

    /// Get the symbol as a string slice
    pub fn as_str(&self) -> &str {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SYMBOL_LENGTH);
        // Construction guarantees ASCII, so this never fails
        std::str::from_utf8(&self.bytes[..end]).unwrap_or("")
    }

    /// Symbol length in bytes
    pub fn len(&self) -> usize {
        self.bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SYMBOL_LENGTH)
    }

    /// Whether the symbol is empty (never true for a parsed symbol)
    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Raw NUL-padded bytes
    pub fn as_bytes(&self) -> &[u8; SYMBOL_LENGTH] {
        &self.bytes
    }

    /// Pack the NUL-padded bytes into a single little-endian word
    ///
    /// Used by the symbol index to claim table slots with one atomic
    /// compare-and-swap. Zero is never a valid packed symbol because
    /// parsed symbols are non-empty.
    pub fn packed(&self) -> u64 {
        u64::from_le_bytes(self.bytes)
    }

    /// Rebuild a symbol from a packed word produced by [`Symbol::packed`]
    pub fn from_packed(word: u64) -> Self {
        Self {
            bytes: word.to_le_bytes(),
        }
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Serialized as a plain string for wire compatibility
impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
