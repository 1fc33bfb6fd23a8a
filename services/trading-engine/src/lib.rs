//! Trading Engine Façade
//!
//! The stable API surface a host process binds against. Everything crosses
//! this boundary as primitives and sentinels: operations return booleans,
//! reads return `Option`s or zeroes, and no internal error type escapes.
//!
//! ```text
//! Host ──▶ TradingEngine ──▶ OrderBook (per symbol) ──▶ MarketDataStore
//!                 │                                          ▲
//!                 └─────────▶ QuoteScheduler ────────────────┘
//! ```

pub mod engine;

pub use engine::{PerformanceMetrics, TradingEngine};
