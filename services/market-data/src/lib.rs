//! Market Data Service
//!
//! Maintains one canonical snapshot per tracked symbol and keeps it fresh
//! from an external quote vendor:
//!
//! ```text
//! QuoteScheduler ──▶ QuoteFetcher ──▶ decode ──▶ MarketDataStore
//!                                                     ▲    │
//!                                  order books ───────┘    └──▶ readers
//! ```
//!
//! The store is a pre-allocated array of cache-line-aligned, seq-locked
//! snapshot slots indexed through a lock-free symbol intern table. Reads are
//! wait-free in the absence of a concurrent writer; writers never block
//! readers.

pub mod clock;
pub mod config;
pub mod decoder;
pub mod fetcher;
pub mod metrics;
pub mod scheduler;
pub mod store;
pub mod symbol_index;

pub use config::FeedConfig;
pub use decoder::{decode_quote, Quote};
pub use fetcher::QuoteFetcher;
pub use scheduler::QuoteScheduler;
pub use store::{market_store, MarketDataStore, SnapshotView};
pub use symbol_index::SymbolIndex;

/// Capacity of the symbol table and snapshot array
pub const MAX_SYMBOLS: usize = 10_000;

/// Response body cap for vendor fetches (bytes)
pub const MAX_RESPONSE_SIZE: usize = 8_192;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
