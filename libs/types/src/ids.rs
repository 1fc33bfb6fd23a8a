//! Identifier types for sidecar entities
//!
//! `SymbolId` is a dense handle assigned by the symbol index; `TradeId` uses
//! UUID v7 for time-sortable ordering so trades can be queried in
//! chronological order from the embedded timestamp.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Dense handle for an interned symbol
///
/// Assigned on first registration and stable for the process lifetime.
/// Slots in the snapshot store are indexed directly by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Sentinel for "not found / table full"
    pub const INVALID: SymbolId = SymbolId(u32::MAX);

    /// Wrap a raw index
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Usable as an array index
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Whether this handle refers to a real slot
    pub const fn is_valid(&self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "INVALID")
        }
    }
}

/// Unique identifier for a trade
///
/// Uses UUID v7 for time-based sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(Uuid);

impl TradeId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
