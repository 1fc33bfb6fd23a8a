//! Lock-free symbol intern table
//!
//! Open-addressed linear-probing table mapping symbol strings to dense
//! [`SymbolId`] handles. The table is append-only: ids are assigned on first
//! registration and never reused or deleted within a process lifetime.
//!
//! # Publication protocol
//!
//! A symbol fits in one 64-bit word (8 NUL-padded ASCII bytes), so slot
//! claiming is a single compare-and-swap on the key word:
//!
//! **Writer:** CAS `key` 0 → packed bytes (the claim), store `id`, then
//! store `active = true` with Release ordering.
//!
//! **Reader:** load `key` with Acquire; on a match, wait for `active`
//! (Acquire) before trusting `id`. A claimed-but-unpublished slot is spun
//! on briefly; the window is two plain stores wide.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use types::ids::SymbolId;
use types::symbol::Symbol;

use crate::MAX_SYMBOLS;

struct SlotEntry {
    /// Packed symbol bytes; 0 means the slot is free
    key: AtomicU64,
    id: AtomicU32,
    /// Set last, with Release; gates reads of `id`
    active: AtomicBool,
}

impl SlotEntry {
    fn new() -> Self {
        Self {
            key: AtomicU64::new(0),
            id: AtomicU32::new(0),
            active: AtomicBool::new(false),
        }
    }
}

/// Concurrent intern table sized to [`MAX_SYMBOLS`]
pub struct SymbolIndex {
    slots: Box<[SlotEntry]>,
    next_id: AtomicU32,
}

impl SymbolIndex {
    pub fn new() -> Self {
        let slots: Vec<SlotEntry> = (0..MAX_SYMBOLS).map(|_| SlotEntry::new()).collect();
        Self {
            slots: slots.into_boxed_slice(),
            next_id: AtomicU32::new(0),
        }
    }

    fn hash_slot(symbol: &Symbol) -> usize {
        let mut hasher = DefaultHasher::new();
        symbol.as_str().hash(&mut hasher);
        (hasher.finish() % MAX_SYMBOLS as u64) as usize
    }

    /// Intern a symbol, assigning a dense id on first registration
    ///
    /// Returns [`SymbolId::INVALID`] when the input is not a valid bounded
    /// symbol or the table is full. Stable: every subsequent call with the
    /// same string returns the same id.
    pub fn intern(&self, symbol: &str) -> SymbolId {
        let sym = match Symbol::parse(symbol) {
            Ok(s) => s,
            Err(_) => return SymbolId::INVALID,
        };
        self.intern_symbol(sym)
    }

    /// Intern an already-validated symbol
    pub fn intern_symbol(&self, sym: Symbol) -> SymbolId {
        let packed = sym.packed();
        let start = Self::hash_slot(&sym);

        for i in 0..MAX_SYMBOLS {
            let slot = &self.slots[(start + i) % MAX_SYMBOLS];

            let key = slot.key.load(Ordering::Acquire);
            if key == packed {
                return Self::wait_published(slot);
            }
            if key == 0 {
                // Free slot: the CAS is the claim. Success means this
                // thread alone publishes id and active.
                match slot
                    .key
                    .compare_exchange(0, packed, Ordering::AcqRel, Ordering::Acquire)
                {
                    Ok(_) => {
                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        slot.id.store(id, Ordering::Relaxed);
                        slot.active.store(true, Ordering::Release);
                        return SymbolId::new(id);
                    }
                    Err(current) if current == packed => {
                        // Lost the race to another thread interning the
                        // same symbol
                        return Self::wait_published(slot);
                    }
                    Err(_) => continue,
                }
            }
            // Occupied by a different symbol: re-probe
        }

        SymbolId::INVALID
    }

    /// Look up a symbol without inserting
    pub fn lookup(&self, symbol: &str) -> SymbolId {
        let sym = match Symbol::parse(symbol) {
            Ok(s) => s,
            Err(_) => return SymbolId::INVALID,
        };
        self.lookup_symbol(sym)
    }

    /// Look up an already-validated symbol
    pub fn lookup_symbol(&self, sym: Symbol) -> SymbolId {
        let packed = sym.packed();
        let start = Self::hash_slot(&sym);

        for i in 0..MAX_SYMBOLS {
            let slot = &self.slots[(start + i) % MAX_SYMBOLS];

            let key = slot.key.load(Ordering::Acquire);
            if key == packed {
                return Self::wait_published(slot);
            }
            if key == 0 {
                // Keys are never deleted, so an empty slot terminates
                // the probe chain.
                return SymbolId::INVALID;
            }
        }

        SymbolId::INVALID
    }

    /// Number of interned symbols
    pub fn len(&self) -> usize {
        (self.next_id.load(Ordering::Relaxed) as usize).min(MAX_SYMBOLS)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spin until the claiming thread has published the slot's id
    fn wait_published(slot: &SlotEntry) -> SymbolId {
        while !slot.active.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
        SymbolId::new(slot.id.load(Ordering::Acquire))
    }
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}
