//! Engine façade
//!
//! Validates every input at the boundary, routes order operations to the
//! per-symbol books, exposes snapshot reads, and owns the quote feed
//! lifecycle. Order books are created lazily on first use and publish into
//! the process-wide snapshot store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{info, warn};

use market_data::clock;
use market_data::metrics::FeedMetrics;
use market_data::store::{market_store, MarketDataStore, SnapshotView};
use market_data::{FeedConfig, QuoteFetcher, QuoteScheduler};
use matching_engine::OrderBook;
use types::errors::EngineError;
use types::order::{Order, Side};
use types::symbol::Symbol;
use types::trade::Trade;

/// Aggregated engine metrics
#[derive(Debug, Clone, Copy)]
pub struct PerformanceMetrics {
    pub feed: FeedMetrics,
    /// Books instantiated so far
    pub books: usize,
    /// Resting orders across all books
    pub open_orders: usize,
    pub uptime_seconds: f64,
}

/// The sidecar's host-facing surface
pub struct TradingEngine {
    books: DashMap<Symbol, Arc<OrderBook>>,
    scheduler: QuoteScheduler,
    store: &'static MarketDataStore,
    halted: AtomicBool,
    started_at: Instant,
}

impl TradingEngine {
    /// Construct with the default feed configuration
    ///
    /// Fails only when the HTTP session cannot be initialized; the
    /// scheduler is never started in that case.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(FeedConfig::default())
    }

    /// Construct with an explicit feed configuration
    pub fn with_config(config: FeedConfig) -> Result<Self, EngineError> {
        let store = market_store();
        let fetcher = QuoteFetcher::new().map_err(|e| {
            warn!(error = %e, "engine startup failed");
            EngineError::Startup(e.to_string())
        })?;

        info!(symbols = config.symbols.len(), "trading engine initialized");
        Ok(Self {
            books: DashMap::new(),
            scheduler: QuoteScheduler::new(store, fetcher, config),
            store,
            halted: AtomicBool::new(false),
            started_at: Instant::now(),
        })
    }

    // Order operations

    /// Admit an order; matches immediately and rests any remainder
    ///
    /// Returns false on any invalid input, duplicate id, or while halted.
    pub fn add_order(
        &self,
        order_id: &str,
        user_id: &str,
        symbol: &str,
        side: &str,
        quantity: i64,
        price: f64,
    ) -> bool {
        if self.halted.load(Ordering::Acquire) {
            return false;
        }
        let Some(order) = Self::build_order(order_id, user_id, symbol, side, quantity, price)
        else {
            return false;
        };
        self.book(order.symbol).add_order(order)
    }

    /// Admit an order and return the trades it produced
    pub fn match_order(
        &self,
        order_id: &str,
        user_id: &str,
        symbol: &str,
        side: &str,
        quantity: i64,
        price: f64,
    ) -> Vec<Trade> {
        if self.halted.load(Ordering::Acquire) {
            return Vec::new();
        }
        let Some(order) = Self::build_order(order_id, user_id, symbol, side, quantity, price)
        else {
            return Vec::new();
        };
        self.book(order.symbol).match_order(order)
    }

    /// Cancel a resting order wherever it rests
    pub fn remove_order(&self, order_id: &str) -> bool {
        if order_id.is_empty() {
            return false;
        }
        self.books
            .iter()
            .any(|entry| entry.value().remove_order(order_id))
    }

    /// Cancel-and-replace; the replacement loses time priority
    pub fn update_order(
        &self,
        order_id: &str,
        user_id: &str,
        symbol: &str,
        side: &str,
        quantity: i64,
        price: f64,
    ) -> bool {
        let Some(order) = Self::build_order(order_id, user_id, symbol, side, quantity, price)
        else {
            return false;
        };
        match self.books.get(&order.symbol) {
            Some(book) => book.update_order(order),
            None => false,
        }
    }

    /// Trades where the given order was the taker
    pub fn get_executed_trades(&self, order_id: &str) -> Vec<Trade> {
        for entry in self.books.iter() {
            let trades = entry.value().executed_trades(order_id);
            if !trades.is_empty() {
                return trades;
            }
        }
        Vec::new()
    }

    /// Resting order count for a symbol
    pub fn get_order_count(&self, symbol: &str) -> usize {
        match Symbol::parse(symbol) {
            Ok(sym) => self
                .books
                .get(&sym)
                .map(|book| book.total_orders())
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Book spread for a symbol; 0.0 when either side is empty
    pub fn get_spread(&self, symbol: &str) -> f64 {
        match Symbol::parse(symbol) {
            Ok(sym) => self
                .books
                .get(&sym)
                .and_then(|book| book.spread())
                .unwrap_or(0.0),
            Err(_) => 0.0,
        }
    }

    // Market data

    /// Consistent snapshot for a symbol
    pub fn get_market_data(&self, symbol: &str) -> Option<SnapshotView> {
        self.store.read(symbol)
    }

    /// Hot path: consistent (bid, ask) pair
    pub fn get_best_prices(&self, symbol: &str) -> Option<(f64, f64)> {
        self.store.read_best_prices(symbol)
    }

    /// Write a snapshot directly (host-driven updates)
    pub fn update_market_data(
        &self,
        symbol: &str,
        best_bid: f64,
        best_ask: f64,
        last_price: f64,
        volume: i64,
    ) -> bool {
        if !(best_bid.is_finite() && best_ask.is_finite() && last_price.is_finite()) {
            return false;
        }
        self.store
            .update(symbol, best_bid, best_ask, last_price, volume)
    }

    pub fn has_valid_market_data(&self, symbol: &str) -> bool {
        self.store.has_valid(symbol)
    }

    /// Force one immediate feed refresh for a symbol
    pub fn update_symbol(&self, symbol: &str) -> bool {
        match Symbol::parse(symbol) {
            Ok(sym) => self.scheduler.update_symbol(sym),
            Err(_) => false,
        }
    }

    // Halt hook

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Static halt hook: while set, `add_order`/`match_order` reject
    pub fn set_halted(&self, halted: bool) {
        self.halted.store(halted, Ordering::Release);
        info!(halted, "halt flag changed");
    }

    // Feed configuration

    /// Replace the tracked symbol list; false if any symbol is invalid
    pub fn set_symbols(&self, symbols: &[&str]) -> bool {
        let mut parsed = Vec::with_capacity(symbols.len());
        for s in symbols {
            match Symbol::parse(s) {
                Ok(sym) => parsed.push(sym),
                Err(_) => return false,
            }
        }
        self.scheduler.set_symbols(parsed);
        true
    }

    pub fn add_symbol(&self, symbol: &str) -> bool {
        match Symbol::parse(symbol) {
            Ok(sym) => {
                self.scheduler.add_symbol(sym);
                true
            }
            Err(_) => false,
        }
    }

    pub fn remove_symbol(&self, symbol: &str) -> bool {
        match Symbol::parse(symbol) {
            Ok(sym) => {
                self.scheduler.remove_symbol(sym);
                true
            }
            Err(_) => false,
        }
    }

    pub fn get_symbols(&self) -> Vec<String> {
        self.scheduler
            .symbols()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }

    pub fn set_api_key(&self, api_key: &str) {
        self.scheduler.set_api_key(api_key);
    }

    /// Sleep between feed sweeps; zero is rejected
    pub fn set_update_interval(&self, interval_ms: u64) -> bool {
        if interval_ms == 0 {
            return false;
        }
        self.scheduler
            .set_update_interval(Duration::from_millis(interval_ms));
        true
    }

    // Lifecycle

    pub fn start(&self) -> bool {
        self.scheduler.start()
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    // Observability

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            feed: self.scheduler.feed_metrics(),
            books: self.books.len(),
            open_orders: self.books.iter().map(|e| e.value().total_orders()).sum(),
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
        }
    }

    pub fn reset_metrics(&self) {
        self.scheduler.reset_metrics();
    }

    /// Running with a responsive fetcher
    pub fn is_healthy(&self) -> bool {
        self.scheduler.is_healthy()
    }

    // Internals

    fn build_order(
        order_id: &str,
        user_id: &str,
        symbol: &str,
        side: &str,
        quantity: i64,
        price: f64,
    ) -> Option<Order> {
        let symbol = Symbol::parse(symbol).ok()?;
        let side = Side::parse(side)?;
        Order::new(
            order_id,
            user_id,
            symbol,
            side,
            quantity,
            price,
            clock::now_ns() as i64,
        )
        .ok()
    }

    /// Get or lazily create the book for a symbol
    fn book(&self, symbol: Symbol) -> Arc<OrderBook> {
        self.books
            .entry(symbol)
            .or_insert_with(|| Arc::new(OrderBook::new(symbol)))
            .clone()
    }
}

impl Drop for TradingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TradingEngine {
        let config = FeedConfig {
            symbols: Vec::new(),
            ..FeedConfig::default()
        };
        TradingEngine::with_config(config).unwrap()
    }

    #[test]
    fn test_add_order_validation() {
        let engine = engine();

        assert!(engine.add_order("o1", "u1", "FAC1", "BUY", 100, 10.0));
        // Bad side
        assert!(!engine.add_order("o2", "u1", "FAC1", "buy", 100, 10.0));
        // Bad quantity
        assert!(!engine.add_order("o3", "u1", "FAC1", "BUY", 0, 10.0));
        // Bad price
        assert!(!engine.add_order("o4", "u1", "FAC1", "BUY", 100, -1.0));
        // Overlong symbol
        assert!(!engine.add_order("o5", "u1", "TOOLONGSYM", "BUY", 100, 10.0));
        // Empty id
        assert!(!engine.add_order("", "u1", "FAC1", "BUY", 100, 10.0));

        assert_eq!(engine.get_order_count("FAC1"), 1);
    }

    #[test]
    fn test_halt_hook_rejects_orders() {
        let engine = engine();
        assert!(!engine.is_halted());

        engine.set_halted(true);
        assert!(engine.is_halted());
        assert!(!engine.add_order("o1", "u1", "FAC2", "BUY", 100, 10.0));
        assert!(engine.match_order("o2", "u1", "FAC2", "SELL", 100, 10.0).is_empty());

        engine.set_halted(false);
        assert!(engine.add_order("o1", "u1", "FAC2", "BUY", 100, 10.0));
    }

    #[test]
    fn test_remove_order_scans_books() {
        let engine = engine();
        engine.add_order("rm1", "u1", "FAC3", "BUY", 100, 10.0);
        engine.add_order("rm2", "u1", "FAC4", "SELL", 50, 20.0);

        assert!(engine.remove_order("rm2"));
        assert!(engine.remove_order("rm1"));
        assert!(!engine.remove_order("rm1"));
        assert!(!engine.remove_order(""));
    }

    #[test]
    fn test_match_and_trade_lookup() {
        let engine = engine();
        engine.add_order("m1", "u1", "FAC5", "BUY", 100, 10.0);

        let trades = engine.match_order("m2", "u2", "FAC5", "SELL", 100, 10.0);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 100);

        let looked_up = engine.get_executed_trades("m2");
        assert_eq!(looked_up.len(), 1);
        assert_eq!(looked_up[0].trade_id, trades[0].trade_id);
        assert!(engine.get_executed_trades("nobody").is_empty());
    }

    #[test]
    fn test_market_data_roundtrip() {
        let engine = engine();
        assert!(!engine.has_valid_market_data("FAC6"));
        assert!(engine.get_market_data("FAC6").is_none());

        assert!(engine.update_market_data("FAC6", 99.0, 101.0, 100.0, 5000));
        assert!(engine.has_valid_market_data("FAC6"));

        let view = engine.get_market_data("FAC6").unwrap();
        assert_eq!(view.best_bid, 99.0);
        assert_eq!(view.best_ask, 101.0);
        assert_eq!(view.spread, 2.0);
        assert_eq!(engine.get_best_prices("FAC6"), Some((99.0, 101.0)));
    }

    #[test]
    fn test_update_market_data_rejects_non_finite() {
        let engine = engine();
        assert!(!engine.update_market_data("FAC7", f64::NAN, 1.0, 1.0, 1));
        assert!(!engine.update_market_data("FAC7", 1.0, f64::INFINITY, 1.0, 1));
        assert!(!engine.has_valid_market_data("FAC7"));
    }

    #[test]
    fn test_symbol_configuration() {
        let engine = engine();
        assert!(engine.set_symbols(&["AAA", "BBB"]));
        assert_eq!(engine.get_symbols(), vec!["AAA", "BBB"]);

        assert!(engine.add_symbol("CCC"));
        assert!(!engine.add_symbol("TOOLONGSYM"));
        assert!(engine.remove_symbol("AAA"));
        assert_eq!(engine.get_symbols(), vec!["BBB", "CCC"]);

        // One bad symbol rejects the whole list, leaving config unchanged
        assert!(!engine.set_symbols(&["DDD", "TOOLONGSYM"]));
        assert_eq!(engine.get_symbols(), vec!["BBB", "CCC"]);
    }

    #[test]
    fn test_update_interval_validation() {
        let engine = engine();
        assert!(engine.set_update_interval(100));
        assert!(!engine.set_update_interval(0));
    }

    #[test]
    fn test_lifecycle() {
        let engine = engine();
        assert!(!engine.is_running());
        assert!(!engine.is_healthy(), "not healthy before start");

        assert!(engine.start());
        assert!(engine.is_running());
        assert!(engine.is_healthy());

        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_performance_metrics() {
        let engine = engine();
        engine.add_order("pm1", "u1", "FAC8", "BUY", 100, 10.0);

        let metrics = engine.get_performance_metrics();
        assert!(metrics.books >= 1);
        assert!(metrics.open_orders >= 1);
        assert!(metrics.uptime_seconds >= 0.0);

        engine.reset_metrics();
        assert_eq!(engine.get_performance_metrics().feed.scheduler.total_updates, 0);
    }

    #[test]
    fn test_get_spread_via_book() {
        let engine = engine();
        assert_eq!(engine.get_spread("FAC9"), 0.0);

        engine.add_order("sp1", "u1", "FAC9", "BUY", 10, 10.0);
        engine.add_order("sp2", "u1", "FAC9", "SELL", 10, 10.5);
        assert!((engine.get_spread("FAC9") - 0.5).abs() < 1e-9);
    }
}
