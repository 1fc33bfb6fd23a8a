//! Polling ingestion scheduler
//!
//! A single worker thread sweeps the configured symbol list: for each
//! symbol it fetches the vendor quote, decodes it, and publishes into the
//! snapshot store. A global rate gate keeps a minimum spacing between any
//! two outgoing requests. Per-symbol failures are counted and never
//! terminate the worker; a panicking sweep backs off 100 ms and resumes.
//!
//! Lifecycle: `start` spawns the worker (idempotent), `stop` clears the
//! running flag and joins (idempotent, cooperative). The flag is checked at
//! every symbol boundary and after every sleep. Reconfiguration takes
//! effect at the next sweep boundary.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use types::errors::FeedError;
use types::symbol::Symbol;

use crate::clock;
use crate::config::FeedConfig;
use crate::decoder::decode_quote;
use crate::fetcher::QuoteFetcher;
use crate::metrics::{FeedMetrics, FetcherMetrics, SchedulerMetrics};
use crate::store::MarketDataStore;

const SWEEP_PANIC_BACKOFF: Duration = Duration::from_millis(100);

struct Shared {
    fetcher: QuoteFetcher,
    config: Mutex<FeedConfig>,
    running: AtomicBool,
    total_updates: AtomicU64,
    failed_updates: AtomicU64,
    latency_ns: AtomicU64,
    /// Millis of the last outgoing request, any symbol (global rate gate)
    last_request_ms: AtomicU64,
    started_at_ms: AtomicU64,
}

/// Periodic quote poller feeding the snapshot store
pub struct QuoteScheduler {
    store: &'static MarketDataStore,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QuoteScheduler {
    /// Wire a scheduler to a store with an initialized fetcher
    pub fn new(store: &'static MarketDataStore, fetcher: QuoteFetcher, config: FeedConfig) -> Self {
        Self {
            store,
            shared: Arc::new(Shared {
                fetcher,
                config: Mutex::new(config),
                running: AtomicBool::new(false),
                total_updates: AtomicU64::new(0),
                failed_updates: AtomicU64::new(0),
                latency_ns: AtomicU64::new(0),
                last_request_ms: AtomicU64::new(0),
                started_at_ms: AtomicU64::new(clock::now_millis()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Start the worker; a second start is a no-op returning true
    pub fn start(&self) -> bool {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            debug!("quote scheduler already running");
            return true;
        }

        let store = self.store;
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("quote-feed".to_string())
            .spawn(move || Self::run(store, shared));

        match spawned {
            Ok(handle) => {
                if let Ok(mut worker) = self.worker.lock() {
                    *worker = Some(handle);
                }
                info!("quote scheduler started");
                true
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                error!(error = %e, "failed to spawn quote feed worker");
                false
            }
        }
    }

    /// Stop cooperatively and join the worker; idempotent
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        info!("quote scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn run(store: &'static MarketDataStore, shared: Arc<Shared>) {
        info!("quote feed worker started");

        while shared.running.load(Ordering::Acquire) {
            let sweep = catch_unwind(AssertUnwindSafe(|| Self::sweep(store, &shared)));
            if sweep.is_err() {
                warn!("sweep panicked, backing off");
                std::thread::sleep(SWEEP_PANIC_BACKOFF);
            }

            let interval = shared
                .config
                .lock()
                .map(|c| c.update_interval)
                .unwrap_or(Duration::from_millis(12));
            std::thread::sleep(interval);
        }

        info!("quote feed worker stopped");
    }

    fn sweep(store: &'static MarketDataStore, shared: &Shared) {
        let (symbols, api_key, endpoint, min_gap_ms) = {
            let Ok(cfg) = shared.config.lock() else {
                return;
            };
            (
                cfg.symbols.clone(),
                cfg.api_key.clone(),
                cfg.endpoint.clone(),
                cfg.min_update_interval.as_millis() as u64,
            )
        };

        for symbol in symbols {
            if !shared.running.load(Ordering::Acquire) {
                break;
            }
            // Global spacing: skip the symbol this sweep rather than wait
            let now = clock::now_millis();
            if now.saturating_sub(shared.last_request_ms.load(Ordering::Relaxed)) < min_gap_ms {
                continue;
            }
            Self::refresh(store, shared, symbol, &endpoint, &api_key);
        }
    }

    /// One fetch, decode, store round for a symbol
    fn refresh(
        store: &'static MarketDataStore,
        shared: &Shared,
        symbol: Symbol,
        endpoint: &str,
        api_key: &str,
    ) -> bool {
        let start = Instant::now();
        let outcome = Self::fetch_decode_store(store, shared, symbol, endpoint, api_key);
        shared
            .last_request_ms
            .store(clock::now_millis(), Ordering::Relaxed);
        shared
            .latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);

        match outcome {
            Ok(()) => {
                shared.total_updates.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                shared.failed_updates.fetch_add(1, Ordering::Relaxed);
                debug!(symbol = %symbol, error = %e, "symbol refresh failed");
                false
            }
        }
    }

    fn fetch_decode_store(
        store: &'static MarketDataStore,
        shared: &Shared,
        symbol: Symbol,
        endpoint: &str,
        api_key: &str,
    ) -> Result<(), FeedError> {
        let url = QuoteFetcher::build_quote_url(endpoint, symbol, api_key);
        let body = shared.fetcher.get(&url)?;
        let quote = decode_quote(symbol, &body).map_err(|e| FeedError::Decode(e.to_string()))?;

        if !store.update_symbol(
            symbol,
            quote.best_bid,
            quote.best_ask,
            quote.last_price,
            quote.volume,
        ) {
            return Err(FeedError::CapacityExhausted);
        }
        Ok(())
    }

    /// Force one immediate refresh for a symbol, bypassing the rate gate
    pub fn update_symbol(&self, symbol: Symbol) -> bool {
        let (endpoint, api_key) = {
            let Ok(cfg) = self.shared.config.lock() else {
                return false;
            };
            (cfg.endpoint.clone(), cfg.api_key.clone())
        };
        Self::refresh(self.store, &self.shared, symbol, &endpoint, &api_key)
    }

    // Configuration: effective at the next sweep boundary

    pub fn set_symbols(&self, symbols: Vec<Symbol>) {
        if let Ok(mut cfg) = self.shared.config.lock() {
            info!(count = symbols.len(), "symbol list replaced");
            cfg.symbols = symbols;
        }
    }

    pub fn add_symbol(&self, symbol: Symbol) {
        if let Ok(mut cfg) = self.shared.config.lock() {
            if !cfg.symbols.contains(&symbol) {
                info!(symbol = %symbol, "symbol added");
                cfg.symbols.push(symbol);
            }
        }
    }

    pub fn remove_symbol(&self, symbol: Symbol) {
        if let Ok(mut cfg) = self.shared.config.lock() {
            if let Some(pos) = cfg.symbols.iter().position(|s| *s == symbol) {
                info!(symbol = %symbol, "symbol removed");
                cfg.symbols.remove(pos);
            }
        }
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.shared
            .config
            .lock()
            .map(|c| c.symbols.clone())
            .unwrap_or_default()
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) {
        if let Ok(mut cfg) = self.shared.config.lock() {
            cfg.api_key = api_key.into();
            info!("api key updated");
        }
    }

    pub fn set_update_interval(&self, interval: Duration) {
        if let Ok(mut cfg) = self.shared.config.lock() {
            info!(interval_ms = interval.as_millis() as u64, "update interval changed");
            cfg.update_interval = interval;
        }
    }

    pub fn set_min_update_interval(&self, interval: Duration) {
        if let Ok(mut cfg) = self.shared.config.lock() {
            cfg.min_update_interval = interval;
        }
    }

    // Observability

    pub fn metrics(&self) -> SchedulerMetrics {
        let uptime_ms = clock::now_millis()
            .saturating_sub(self.shared.started_at_ms.load(Ordering::Relaxed));
        SchedulerMetrics::derive(
            self.shared.total_updates.load(Ordering::Relaxed),
            self.shared.failed_updates.load(Ordering::Relaxed),
            self.shared.latency_ns.load(Ordering::Relaxed),
            uptime_ms as f64 / 1000.0,
        )
    }

    pub fn fetcher_metrics(&self) -> FetcherMetrics {
        self.shared.fetcher.metrics()
    }

    /// Scheduler + fetcher + store counters in one block
    pub fn feed_metrics(&self) -> FeedMetrics {
        FeedMetrics {
            scheduler: self.metrics(),
            fetcher: self.fetcher_metrics(),
            store: self.store.stats(),
        }
    }

    pub fn reset_metrics(&self) {
        self.shared.total_updates.store(0, Ordering::Relaxed);
        self.shared.failed_updates.store(0, Ordering::Relaxed);
        self.shared.latency_ns.store(0, Ordering::Relaxed);
        self.shared
            .started_at_ms
            .store(clock::now_millis(), Ordering::Relaxed);
        self.shared.fetcher.reset_metrics();
        info!("feed metrics reset");
    }

    pub fn is_healthy(&self) -> bool {
        self.is_running() && self.shared.fetcher.is_healthy()
    }
}

impl Drop for QuoteScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
