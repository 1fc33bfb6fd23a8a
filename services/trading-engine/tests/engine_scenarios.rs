//! End-to-end order flow scenarios through the façade
//!
//! Each scenario uses its own symbol because the snapshot store is a
//! process-wide singleton shared across tests.

use trading_engine::TradingEngine;

fn engine() -> TradingEngine {
    let config = market_data::FeedConfig {
        symbols: Vec::new(),
        ..market_data::FeedConfig::default()
    };
    TradingEngine::with_config(config).unwrap()
}

#[test]
fn equal_price_orders_trade_and_empty_the_book() {
    let engine = engine();

    assert!(engine.add_order("e2e-b1", "alice", "SCEN1", "BUY", 100, 10.0));
    let trades = engine.match_order("e2e-s1", "bob", "SCEN1", "SELL", 100, 10.0);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity, 100);
    assert_eq!(trades[0].price.to_f64(), 10.0);
    assert_eq!(engine.get_order_count("SCEN1"), 0);

    let view = engine.get_market_data("SCEN1").unwrap();
    assert_eq!(view.last_price, 10.0);
}

#[test]
fn sell_sweeps_two_buys_at_same_level_in_fifo_order() {
    let engine = engine();

    engine.add_order("fifo-b1", "alice", "SCEN2", "BUY", 100, 10.0);
    engine.add_order("fifo-b2", "carol", "SCEN2", "BUY", 50, 10.0);

    let trades = engine.match_order("fifo-s1", "bob", "SCEN2", "SELL", 120, 9.5);

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].quantity, 100, "first resting order fills first");
    assert_eq!(trades[0].price.to_f64(), 10.0);
    assert_eq!(trades[1].quantity, 20);
    assert_eq!(trades[1].price.to_f64(), 10.0);

    // BUY 30@10.00 remains
    assert_eq!(engine.get_order_count("SCEN2"), 1);
    let view = engine.get_market_data("SCEN2").unwrap();
    assert_eq!(view.best_bid, 10.0);
}

#[test]
fn buy_walks_ask_levels_best_price_first() {
    let engine = engine();

    engine.add_order("walk-s1", "alice", "SCEN3", "SELL", 10, 20.0);
    engine.add_order("walk-s2", "carol", "SCEN3", "SELL", 5, 21.0);

    let trades = engine.match_order("walk-b1", "bob", "SCEN3", "BUY", 12, 25.0);

    assert_eq!(trades.len(), 2);
    assert_eq!((trades[0].quantity, trades[0].price.to_f64()), (10, 20.0));
    assert_eq!((trades[1].quantity, trades[1].price.to_f64()), (2, 21.0));

    // SELL 3@21 remains
    let view = engine.get_market_data("SCEN3").unwrap();
    assert_eq!(view.best_ask, 21.0);
    assert_eq!(view.volume, 3);
}

#[test]
fn replaced_order_trades_at_its_new_price() {
    let engine = engine();

    engine.add_order("repl-b1", "alice", "SCEN4", "BUY", 100, 10.0);
    assert!(engine.update_order("repl-b1", "alice", "SCEN4", "BUY", 100, 11.0));

    let trades = engine.match_order("repl-s1", "bob", "SCEN4", "SELL", 100, 10.0);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price.to_f64(), 11.0);
    assert_eq!(engine.get_order_count("SCEN4"), 0);
}

#[test]
fn trade_value_is_quantity_times_price() {
    let engine = engine();

    engine.add_order("val-b1", "alice", "SCEN5", "BUY", 8, 12.5);
    let trades = engine.match_order("val-s1", "bob", "SCEN5", "SELL", 8, 12.5);

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].total_value.to_string(), "100.0");
}

#[test]
fn snapshot_reads_stay_consistent_under_order_flow() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let engine = Arc::new(engine());
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let engine = Arc::clone(&engine);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut i = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let bid = 100.0 + (i % 11) as f64;
                let ask = bid + 1.0 + (i % 7) as f64;
                engine.add_order(&format!("flow-b{i}"), "alice", "SCEN6", "BUY", 10, bid);
                engine.add_order(&format!("flow-s{i}"), "bob", "SCEN6", "SELL", 10, ask);
                i += 1;
            }
        })
    };

    let mut consistent_reads = 0u64;
    while consistent_reads < 1_000 {
        if let Some(view) = engine.get_market_data("SCEN6") {
            assert_eq!(
                view.spread,
                view.best_ask - view.best_bid,
                "seq-locked read returned a torn tuple"
            );
            consistent_reads += 1;
        }
    }

    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}
