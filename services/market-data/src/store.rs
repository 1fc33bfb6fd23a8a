//! Lock-free market data snapshot store
//!
//! A pre-allocated array of cache-line-aligned snapshot slots, one per
//! interned symbol. Writers publish with a sequence lock; readers retry
//! until they observe a point-in-time-consistent tuple. Reads are wait-free
//! whenever no write is in flight.
//!
//! # Seqlock protocol
//!
//! **Writer:** CAS `seq` from even to odd (Acquire) — concurrent writers
//! serialize here — then store the payload fields (Release), then store
//! `seq + 2` (Release, back to even).
//!
//! **Reader:** load `seq` (Acquire); if odd, a write is in flight — spin.
//! Load the payload (Acquire), load `seq` again (Acquire); if it changed,
//! the read was torn — retry. A successful read therefore observes
//! `spread == best_ask − best_bid` from a single update.
//!
//! `is_valid` transitions false → true exactly once, after the slot's first
//! complete write, and gates all reads.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};

use types::ids::SymbolId;
use types::symbol::Symbol;

use crate::clock;
use crate::symbol_index::SymbolIndex;
use crate::MAX_SYMBOLS;

/// One symbol's snapshot, padded to a cache line
///
/// Prices are IEEE-754 doubles stored as raw bits so each field is
/// independently atomic.
#[repr(align(64))]
struct SnapshotSlot {
    seq: AtomicU32,
    best_bid: AtomicU64,
    best_ask: AtomicU64,
    last_price: AtomicU64,
    spread: AtomicU64,
    volume: AtomicI64,
    timestamp: AtomicU64,
    is_valid: AtomicBool,
}

impl SnapshotSlot {
    fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            best_bid: AtomicU64::new(0),
            best_ask: AtomicU64::new(0),
            last_price: AtomicU64::new(0),
            spread: AtomicU64::new(0),
            volume: AtomicI64::new(0),
            timestamp: AtomicU64::new(0),
            is_valid: AtomicBool::new(false),
        }
    }

    fn write(&self, best_bid: f64, best_ask: f64, last_price: f64, volume: i64) {
        // Claim the slot: even → odd. Multiple writers per slot are
        // permitted; they serialize on this CAS.
        let mut seq = self.seq.load(Ordering::Relaxed);
        loop {
            if seq & 1 == 1 {
                std::hint::spin_loop();
                seq = self.seq.load(Ordering::Relaxed);
                continue;
            }
            match self.seq.compare_exchange_weak(
                seq,
                seq.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => seq = current,
            }
        }

        self.best_bid.store(best_bid.to_bits(), Ordering::Release);
        self.best_ask.store(best_ask.to_bits(), Ordering::Release);
        self.last_price.store(last_price.to_bits(), Ordering::Release);
        self.spread
            .store((best_ask - best_bid).to_bits(), Ordering::Release);
        self.volume.store(volume, Ordering::Release);

        // Per-slot timestamps never go backwards
        let prev = self.timestamp.load(Ordering::Relaxed);
        self.timestamp
            .store(clock::now_ns().max(prev), Ordering::Release);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);

        if !self.is_valid.load(Ordering::Relaxed) {
            self.is_valid.store(true, Ordering::Release);
        }
    }

    fn read(&self) -> Option<SnapshotView> {
        if !self.is_valid.load(Ordering::Acquire) {
            return None;
        }

        loop {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let view = SnapshotView {
                best_bid: f64::from_bits(self.best_bid.load(Ordering::Acquire)),
                best_ask: f64::from_bits(self.best_ask.load(Ordering::Acquire)),
                last_price: f64::from_bits(self.last_price.load(Ordering::Acquire)),
                spread: f64::from_bits(self.spread.load(Ordering::Acquire)),
                volume: self.volume.load(Ordering::Acquire),
                timestamp: self.timestamp.load(Ordering::Acquire),
            };

            let s2 = self.seq.load(Ordering::Acquire);
            if s1 == s2 {
                return Some(view);
            }
            std::hint::spin_loop();
        }
    }

    fn read_best_prices(&self) -> Option<(f64, f64)> {
        if !self.is_valid.load(Ordering::Acquire) {
            return None;
        }

        loop {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let bid = f64::from_bits(self.best_bid.load(Ordering::Acquire));
            let ask = f64::from_bits(self.best_ask.load(Ordering::Acquire));

            let s2 = self.seq.load(Ordering::Acquire);
            if s1 == s2 {
                return Some((bid, ask));
            }
            std::hint::spin_loop();
        }
    }
}

/// A point-in-time-consistent snapshot tuple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotView {
    pub best_bid: f64,
    pub best_ask: f64,
    pub last_price: f64,
    pub spread: f64,
    pub volume: i64,
    /// Nanoseconds since the process monotonic epoch
    pub timestamp: u64,
}

/// Store-level counters (relaxed, eventually consistent)
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub total_updates: u64,
    pub total_reads: u64,
}

/// Pre-allocated snapshot store for up to [`MAX_SYMBOLS`] symbols
pub struct MarketDataStore {
    slots: Box<[SnapshotSlot]>,
    index: SymbolIndex,
    total_updates: AtomicU64,
    total_reads: AtomicU64,
}

impl MarketDataStore {
    pub fn new() -> Self {
        let slots: Vec<SnapshotSlot> = (0..MAX_SYMBOLS).map(|_| SnapshotSlot::new()).collect();
        Self {
            slots: slots.into_boxed_slice(),
            index: SymbolIndex::new(),
            total_updates: AtomicU64::new(0),
            total_reads: AtomicU64::new(0),
        }
    }

    /// Publish a full snapshot for a symbol
    ///
    /// Interns the symbol on first use. Returns false only when interning
    /// fails (invalid symbol or table full); the slot is then untouched.
    pub fn update(
        &self,
        symbol: &str,
        best_bid: f64,
        best_ask: f64,
        last_price: f64,
        volume: i64,
    ) -> bool {
        let id = self.index.intern(symbol);
        self.update_slot(id, best_bid, best_ask, last_price, volume)
    }

    /// Publish for an already-validated symbol
    pub fn update_symbol(
        &self,
        symbol: Symbol,
        best_bid: f64,
        best_ask: f64,
        last_price: f64,
        volume: i64,
    ) -> bool {
        let id = self.index.intern_symbol(symbol);
        self.update_slot(id, best_bid, best_ask, last_price, volume)
    }

    fn update_slot(
        &self,
        id: SymbolId,
        best_bid: f64,
        best_ask: f64,
        last_price: f64,
        volume: i64,
    ) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        slot.write(best_bid, best_ask, last_price, volume);
        self.total_updates.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Read a consistent snapshot
    pub fn read(&self, symbol: &str) -> Option<SnapshotView> {
        let slot = self.slot(self.index.lookup(symbol))?;
        let view = slot.read();
        if view.is_some() {
            self.total_reads.fetch_add(1, Ordering::Relaxed);
        }
        view
    }

    /// Read a consistent snapshot for an already-validated symbol
    pub fn read_symbol(&self, symbol: Symbol) -> Option<SnapshotView> {
        let slot = self.slot(self.index.lookup_symbol(symbol))?;
        let view = slot.read();
        if view.is_some() {
            self.total_reads.fetch_add(1, Ordering::Relaxed);
        }
        view
    }

    /// Hot path: consistent (bid, ask) pair
    pub fn read_best_prices(&self, symbol: &str) -> Option<(f64, f64)> {
        self.slot(self.index.lookup(symbol))?.read_best_prices()
    }

    /// Whether the symbol's slot has been written at least once
    pub fn has_valid(&self, symbol: &str) -> bool {
        match self.slot(self.index.lookup(symbol)) {
            Some(slot) => slot.is_valid.load(Ordering::Acquire),
            None => false,
        }
    }

    /// Whether an already-validated symbol's slot has been written
    pub fn has_valid_symbol(&self, symbol: Symbol) -> bool {
        match self.slot(self.index.lookup_symbol(symbol)) {
            Some(slot) => slot.is_valid.load(Ordering::Acquire),
            None => false,
        }
    }

    /// The store's intern table
    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_updates: self.total_updates.load(Ordering::Relaxed),
            total_reads: self.total_reads.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, id: SymbolId) -> Option<&SnapshotSlot> {
        if !id.is_valid() {
            return None;
        }
        self.slots.get(id.as_usize())
    }
}

impl Default for MarketDataStore {
    fn default() -> Self {
        Self::new()
    }
}

// One canonical snapshot per symbol, shared by the ingestion scheduler and
// every order book. Never torn down before all holders are gone (process
// lifetime).
static GLOBAL_STORE: Lazy<MarketDataStore> = Lazy::new(MarketDataStore::new);

/// The process-wide snapshot store
pub fn market_store() -> &'static MarketDataStore {
    &GLOBAL_STORE
}
