//! Per-symbol order book
//!
//! Two-sided book with price-time priority matching. Admission matches the
//! incoming order against resting liquidity first and rests any remainder,
//! so the book is never crossed once an operation returns.
//!
//! All structural state lives in `BookInner` behind one reader-writer lock;
//! inner methods never take the lock themselves, so compound operations
//! (cancel-and-replace) run under a single write guard. After every
//! mutation the book recomputes best bid/ask from the sorted structure and
//! publishes to the process-wide snapshot store; the per-book atomics are
//! cached hints only and the store is authoritative for external readers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use market_data::clock;
use market_data::store::{market_store, MarketDataStore};
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;
use types::errors::OrderError;
use types::numeric::Price;
use types::order::{Order, Side};
use types::symbol::Symbol;
use types::trade::Trade;

use crate::book::{AskBook, BidBook};
use crate::matching::crossing;
use crate::matching::executor::TradeExecutor;

/// Side and price of a resting order, for O(1) cancel routing
///
/// Remaining quantities live in the level queues only; this map never goes
/// stale on partial fills.
#[derive(Debug, Clone, Copy)]
struct RestingOrder {
    side: Side,
    price: Price,
}

/// Book state guarded by the outer lock
///
/// Methods here never lock; callers hold the write guard.
struct BookInner {
    bids: BidBook,
    asks: AskBook,
    orders: HashMap<String, RestingOrder>,
    total_volume: i64,
    executor: TradeExecutor,
}

/// Best prices and totals captured under the lock for publication
#[derive(Debug, Clone, Copy)]
struct BookTop {
    best_bid: Option<Price>,
    best_ask: Option<Price>,
    total_volume: i64,
}

impl BookInner {
    fn new() -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
            orders: HashMap::new(),
            total_volume: 0,
            executor: TradeExecutor::new(),
        }
    }

    /// Match an incoming order and rest the remainder
    ///
    /// Price-time priority: consumes the best opposing level front-first,
    /// trading at the maker's price, until the order is filled or no
    /// crossing level remains.
    fn submit(&mut self, order: &Order) -> Result<Vec<Trade>, OrderError> {
        if self.orders.contains_key(&order.order_id) {
            return Err(OrderError::DuplicateOrderId(order.order_id.clone()));
        }

        let mut remaining = order.quantity;
        let mut trades = Vec::new();
        let executed_at = clock::now_ns() as i64;

        // Split borrows: each side, the id map, and the executor are
        // disjoint fields
        let Self {
            bids,
            asks,
            orders,
            total_volume,
            executor,
        } = self;

        match order.side {
            Side::BUY => {
                while remaining > 0 {
                    let Some((level_price, level)) = asks.best_level_mut() else {
                        break;
                    };
                    if !crossing::crosses(order.price, level_price) {
                        break;
                    }
                    let Some((_, maker_remaining)) = level.peek_front() else {
                        break;
                    };

                    let fill = remaining.min(maker_remaining);
                    let trade = executor
                        .execute(
                            order.symbol,
                            &order.order_id,
                            &order.user_id,
                            Side::BUY,
                            level_price,
                            fill,
                            executed_at,
                        )
                        .map_err(|_| OrderError::InvalidQuantity(fill))?;
                    trades.push(trade);

                    remaining -= fill;
                    *total_volume -= fill;
                    if let Some(maker_id) = level.fill_front(fill) {
                        orders.remove(&maker_id);
                    }
                    asks.prune_empty(level_price);
                }
            }
            Side::SELL => {
                while remaining > 0 {
                    let Some((level_price, level)) = bids.best_level_mut() else {
                        break;
                    };
                    if !crossing::crosses(level_price, order.price) {
                        break;
                    }
                    let Some((_, maker_remaining)) = level.peek_front() else {
                        break;
                    };

                    let fill = remaining.min(maker_remaining);
                    let trade = executor
                        .execute(
                            order.symbol,
                            &order.order_id,
                            &order.user_id,
                            Side::SELL,
                            level_price,
                            fill,
                            executed_at,
                        )
                        .map_err(|_| OrderError::InvalidQuantity(fill))?;
                    trades.push(trade);

                    remaining -= fill;
                    *total_volume -= fill;
                    if let Some(maker_id) = level.fill_front(fill) {
                        orders.remove(&maker_id);
                    }
                    bids.prune_empty(level_price);
                }
            }
        }

        if remaining > 0 {
            match order.side {
                Side::BUY => bids.insert(order.price, order.order_id.clone(), remaining),
                Side::SELL => asks.insert(order.price, order.order_id.clone(), remaining),
            }
            orders.insert(
                order.order_id.clone(),
                RestingOrder {
                    side: order.side,
                    price: order.price,
                },
            );
            *total_volume += remaining;
        }

        Ok(trades)
    }

    /// Remove a resting order, returning its remaining quantity
    fn remove(&mut self, order_id: &str) -> Option<i64> {
        let resting = self.orders.remove(order_id)?;
        let removed = match resting.side {
            Side::BUY => self.bids.remove(order_id, resting.price),
            Side::SELL => self.asks.remove(order_id, resting.price),
        };
        if let Some(quantity) = removed {
            self.total_volume -= quantity;
        }
        removed
    }

    fn top(&self) -> BookTop {
        BookTop {
            best_bid: self.bids.best_price(),
            best_ask: self.asks.best_price(),
            total_volume: self.total_volume,
        }
    }
}

/// A per-symbol order book wired to the snapshot store
pub struct OrderBook {
    symbol: Symbol,
    inner: RwLock<BookInner>,
    /// Executed-trade log, appended on every fill
    trades: Mutex<Vec<Trade>>,
    store: &'static MarketDataStore,
    // Cached hints, refreshed on publication; the sorted structure is the
    // source of truth
    best_bid_hint: AtomicU64,
    best_ask_hint: AtomicU64,
    last_price_bits: AtomicU64,
}

impl OrderBook {
    /// Create a book publishing to the process-wide store
    pub fn new(symbol: Symbol) -> Self {
        Self::with_store(symbol, market_store())
    }

    /// Create a book publishing to a specific store
    pub fn with_store(symbol: Symbol, store: &'static MarketDataStore) -> Self {
        debug!(symbol = %symbol, "order book created");
        Self {
            symbol,
            inner: RwLock::new(BookInner::new()),
            trades: Mutex::new(Vec::new()),
            store,
            best_bid_hint: AtomicU64::new(0f64.to_bits()),
            best_ask_hint: AtomicU64::new(0f64.to_bits()),
            last_price_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Admit an order: match, rest the remainder
    ///
    /// Returns false on symbol mismatch or duplicate id; quantity and price
    /// are validated at `Order` construction.
    pub fn add_order(&self, order: Order) -> bool {
        self.admit(&order).is_ok()
    }

    /// Admit an order and return the trades it produced
    ///
    /// Rejected orders produce no trades.
    pub fn match_order(&self, order: Order) -> Vec<Trade> {
        self.admit(&order).unwrap_or_default()
    }

    fn admit(&self, order: &Order) -> Result<Vec<Trade>, OrderError> {
        if order.symbol != self.symbol {
            return Err(OrderError::SymbolMismatch(order.symbol.to_string()));
        }

        let mut inner = write_guard(&self.inner);
        let trades = inner.submit(order)?;
        let top = inner.top();
        drop(inner);

        if let Some(last) = trades.last() {
            self.last_price_bits
                .store(last.price.to_f64().to_bits(), Ordering::Relaxed);
        }
        if !trades.is_empty() {
            debug!(
                symbol = %self.symbol,
                order_id = %order.order_id,
                fills = trades.len(),
                "order matched"
            );
            if let Ok(mut log) = self.trades.lock() {
                log.extend(trades.iter().cloned());
            }
        }

        self.publish(top);
        Ok(trades)
    }

    /// Cancel a resting order
    ///
    /// Returns false for unknown ids.
    pub fn remove_order(&self, order_id: &str) -> bool {
        let mut inner = write_guard(&self.inner);
        let removed = inner.remove(order_id).is_some();
        let top = inner.top();
        drop(inner);

        if removed {
            debug!(symbol = %self.symbol, order_id, "order removed");
            self.publish(top);
        }
        removed
    }

    /// Cancel-and-replace under one write guard
    ///
    /// The replacement loses the original's time priority and may match
    /// immediately. Returns false when the original id is unknown.
    pub fn update_order(&self, order: Order) -> bool {
        if order.symbol != self.symbol {
            return false;
        }

        let mut inner = write_guard(&self.inner);
        if inner.remove(&order.order_id).is_none() {
            return false;
        }
        // The id was just vacated, so only executor-level failures remain
        let trades = match inner.submit(&order) {
            Ok(trades) => trades,
            Err(_) => return false,
        };
        let top = inner.top();
        drop(inner);

        if let Some(last) = trades.last() {
            self.last_price_bits
                .store(last.price.to_f64().to_bits(), Ordering::Relaxed);
        }
        if !trades.is_empty() {
            if let Ok(mut log) = self.trades.lock() {
                log.extend(trades.iter().cloned());
            }
        }

        debug!(symbol = %self.symbol, order_id = %order.order_id, "order replaced");
        self.publish(top);
        true
    }

    /// Best bid recomputed from the sorted structure
    pub fn best_bid(&self) -> Option<f64> {
        read_guard(&self.inner).bids.best_price().map(|p| p.to_f64())
    }

    /// Best ask recomputed from the sorted structure
    pub fn best_ask(&self) -> Option<f64> {
        read_guard(&self.inner).asks.best_price().map(|p| p.to_f64())
    }

    /// Ask minus bid when both sides are populated
    pub fn spread(&self) -> Option<f64> {
        let inner = read_guard(&self.inner);
        let bid = inner.bids.best_price()?;
        let ask = inner.asks.best_price()?;
        (ask - bid).to_f64()
    }

    /// Resting order count across both sides
    pub fn total_orders(&self) -> usize {
        read_guard(&self.inner).orders.len()
    }

    /// Total resting quantity across both sides
    pub fn total_volume(&self) -> i64 {
        read_guard(&self.inner).total_volume
    }

    /// Last trade price; 0.0 before any trade
    pub fn last_price(&self) -> f64 {
        f64::from_bits(self.last_price_bits.load(Ordering::Relaxed))
    }

    /// Cached best bid; may lag the structure between publications
    pub fn best_bid_hint(&self) -> f64 {
        f64::from_bits(self.best_bid_hint.load(Ordering::Relaxed))
    }

    /// Cached best ask; may lag the structure between publications
    pub fn best_ask_hint(&self) -> f64 {
        f64::from_bits(self.best_ask_hint.load(Ordering::Relaxed))
    }

    /// Trades where the given order was the taker
    pub fn executed_trades(&self, order_id: &str) -> Vec<Trade> {
        self.trades
            .lock()
            .map(|log| {
                log.iter()
                    .filter(|t| t.taker_order_id == order_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The most recent `n` trades, oldest first
    pub fn recent_trades(&self, n: usize) -> Vec<Trade> {
        self.trades
            .lock()
            .map(|log| {
                let start = log.len().saturating_sub(n);
                log[start..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Republish the book's current top to the snapshot store
    pub fn update_market_data_from_book(&self) {
        let top = read_guard(&self.inner).top();
        self.publish(top);
    }

    fn publish(&self, top: BookTop) {
        let bid = top.best_bid.map(|p| p.to_f64()).unwrap_or(0.0);
        let ask = top.best_ask.map(|p| p.to_f64()).unwrap_or(0.0);

        self.best_bid_hint.store(bid.to_bits(), Ordering::Relaxed);
        self.best_ask_hint.store(ask.to_bits(), Ordering::Relaxed);

        self.store
            .update_symbol(self.symbol, bid, ask, self.last_price(), top.total_volume);
    }
}

fn write_guard<'a>(lock: &'a RwLock<BookInner>) -> RwLockWriteGuard<'a, BookInner> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_guard<'a>(lock: &'a RwLock<BookInner>) -> RwLockReadGuard<'a, BookInner> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    fn test_book() -> OrderBook {
        OrderBook::with_store(sym(), Box::leak(Box::new(MarketDataStore::new())))
    }

    fn order(id: &str, side: Side, quantity: i64, price: f64) -> Order {
        Order::new(id, "user-1", sym(), side, quantity, price, clock::now_ns() as i64).unwrap()
    }

    #[test]
    fn test_equal_price_full_fill() {
        let book = test_book();
        assert!(book.add_order(order("b1", Side::BUY, 100, 10.0)));

        let trades = book.match_order(order("s1", Side::SELL, 100, 10.0));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 100);
        assert_eq!(trades[0].price.to_f64(), 10.0);
        assert_eq!(trades[0].taker_order_id, "s1");

        assert_eq!(book.total_orders(), 0);
        assert_eq!(book.total_volume(), 0);
        assert_eq!(book.last_price(), 10.0);
    }

    #[test]
    fn test_partial_fill_rests_remainder() {
        let book = test_book();
        book.add_order(order("b1", Side::BUY, 100, 10.0));
        book.add_order(order("b2", Side::BUY, 50, 10.0));

        let trades = book.match_order(order("s1", Side::SELL, 120, 9.5));
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].quantity, 100);
        assert_eq!(trades[0].price.to_f64(), 10.0);
        assert_eq!(trades[1].quantity, 20);
        assert_eq!(trades[1].price.to_f64(), 10.0);

        // 30 of b2 remains at 10.00
        assert_eq!(book.best_bid(), Some(10.0));
        assert_eq!(book.total_orders(), 1);
        assert_eq!(book.total_volume(), 30);
    }

    #[test]
    fn test_walks_ask_levels_in_price_order() {
        let book = test_book();
        book.add_order(order("s1", Side::SELL, 10, 20.0));
        book.add_order(order("s2", Side::SELL, 5, 21.0));

        let trades = book.match_order(order("b1", Side::BUY, 12, 25.0));
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].quantity, 10);
        assert_eq!(trades[0].price.to_f64(), 20.0);
        assert_eq!(trades[1].quantity, 2);
        assert_eq!(trades[1].price.to_f64(), 21.0);

        // SELL 3@21 remains
        assert_eq!(book.best_ask(), Some(21.0));
        assert_eq!(book.total_volume(), 3);
        assert_eq!(book.last_price(), 21.0);
    }

    #[test]
    fn test_update_order_resets_priority_and_price() {
        let book = test_book();
        book.add_order(order("b1", Side::BUY, 100, 10.0));

        assert!(book.update_order(order("b1", Side::BUY, 100, 11.0)));
        assert_eq!(book.best_bid(), Some(11.0));

        let trades = book.match_order(order("s1", Side::SELL, 100, 10.0));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price.to_f64(), 11.0);
    }

    #[test]
    fn test_update_unknown_order_fails() {
        let book = test_book();
        assert!(!book.update_order(order("ghost", Side::BUY, 10, 10.0)));
    }

    #[test]
    fn test_remove_order() {
        let book = test_book();
        book.add_order(order("b1", Side::BUY, 100, 10.0));

        assert!(book.remove_order("b1"));
        assert!(!book.remove_order("b1"));
        assert_eq!(book.total_orders(), 0);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let book = test_book();
        assert!(book.add_order(order("b1", Side::BUY, 100, 10.0)));
        assert!(!book.add_order(order("b1", Side::BUY, 50, 9.0)));
        assert_eq!(book.total_orders(), 1);
        assert_eq!(book.total_volume(), 100);
    }

    #[test]
    fn test_fifo_within_level() {
        let book = test_book();
        book.add_order(order("first", Side::BUY, 60, 10.0));
        book.add_order(order("second", Side::BUY, 60, 10.0));

        // A sell for 60 consumes "first" entirely and none of "second"
        let trades = book.match_order(order("s1", Side::SELL, 60, 10.0));
        assert_eq!(trades.len(), 1);
        assert_eq!(book.total_volume(), 60);

        // "second" is still cancellable, "first" is gone
        assert!(!book.remove_order("first"));
        assert!(book.remove_order("second"));
    }

    #[test]
    fn test_book_never_crossed_after_admission() {
        let book = test_book();
        book.add_order(order("s1", Side::SELL, 50, 10.0));
        // Aggressive buy above the ask: fills 50, rests 50 at 12
        book.add_order(order("b1", Side::BUY, 100, 12.0));

        let bid = book.best_bid().unwrap();
        assert!(book.best_ask().is_none());
        assert_eq!(bid, 12.0);

        // Another sell below the resting bid trades rather than crossing
        book.add_order(order("s2", Side::SELL, 20, 11.0));
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask);
        }
    }

    #[test]
    fn test_quantity_conservation() {
        let book = test_book();
        book.add_order(order("b1", Side::BUY, 70, 10.0));
        book.add_order(order("b2", Side::BUY, 40, 9.0));

        let taker_quantity = 100;
        let trades = book.match_order(order("s1", Side::SELL, taker_quantity, 9.0));
        let filled: i64 = trades.iter().map(|t| t.quantity).sum();

        // b1 fully filled (70), b2 filled 30; 10 of b2 rests, taker is done
        assert_eq!(filled, taker_quantity);
        assert_eq!(book.total_volume(), 10);
        assert!(trades.iter().all(|t| t.quantity > 0));
    }

    #[test]
    fn test_executed_trades_lookup() {
        let book = test_book();
        book.add_order(order("b1", Side::BUY, 100, 10.0));
        book.match_order(order("s1", Side::SELL, 40, 10.0));
        book.match_order(order("s2", Side::SELL, 60, 10.0));

        assert_eq!(book.executed_trades("s1").len(), 1);
        assert_eq!(book.executed_trades("s2").len(), 1);
        assert!(book.executed_trades("b1").is_empty(), "b1 was the maker");
        assert_eq!(book.recent_trades(10).len(), 2);
    }

    #[test]
    fn test_publishes_to_store() {
        let store: &'static MarketDataStore = Box::leak(Box::new(MarketDataStore::new()));
        let book = OrderBook::with_store(sym(), store);

        book.add_order(order("b1", Side::BUY, 100, 10.0));
        book.add_order(order("s1", Side::SELL, 100, 11.0));

        let view = store.read_symbol(sym()).expect("book published");
        assert_eq!(view.best_bid, 10.0);
        assert_eq!(view.best_ask, 11.0);
        assert_eq!(view.volume, 200);

        book.match_order(order("s2", Side::SELL, 100, 10.0));
        let view = store.read_symbol(sym()).unwrap();
        assert_eq!(view.last_price, 10.0);
        assert_eq!(view.best_bid, 0.0);
        assert_eq!(view.best_ask, 11.0);
    }

    #[test]
    fn test_spread() {
        let book = test_book();
        assert_eq!(book.spread(), None);

        book.add_order(order("b1", Side::BUY, 10, 10.0));
        assert_eq!(book.spread(), None);

        book.add_order(order("s1", Side::SELL, 10, 10.5));
        assert!((book.spread().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_symbol_mismatch_rejected() {
        let book = test_book();
        let other = Symbol::parse("TSLA").unwrap();
        let stray =
            Order::new("x1", "u", other, Side::BUY, 10, 10.0, clock::now_ns() as i64).unwrap();
        assert!(!book.add_order(stray));
    }
}
