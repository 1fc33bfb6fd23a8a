//! Quote vendor HTTP client
//!
//! A blocking GET client tuned for co-located polling: pooled connections
//! with TCP keep-alive, aggressive timeouts (the vendor either answers fast
//! or the sweep moves on), and a hard response-size cap. Requests are
//! serialized through a session mutex so multiple schedulers sharing one
//! fetcher cannot interleave on the wire.

use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;
use types::errors::FeedError;
use types::symbol::Symbol;

use crate::metrics::FetcherMetrics;
use crate::MAX_RESPONSE_SIZE;

const TOTAL_TIMEOUT: Duration = Duration::from_millis(100);
const CONNECT_TIMEOUT: Duration = Duration::from_millis(50);
const KEEPALIVE: Duration = Duration::from_secs(60);

/// Blocking HTTP client for the quote vendor
pub struct QuoteFetcher {
    client: reqwest::blocking::Client,
    /// Serializes outgoing requests across sharers
    session: Mutex<()>,
    requests: AtomicU64,
    failures: AtomicU64,
    latency_ns: AtomicU64,
}

impl QuoteFetcher {
    /// Build the client
    ///
    /// Failure here (TLS backend, resolver init) is the one fatal startup
    /// error: the caller must not start the scheduler without a fetcher.
    pub fn new() -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TOTAL_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(KEEPALIVE)
            .pool_max_idle_per_host(2)
            .gzip(true)
            .user_agent("trading-sidecar/0.1")
            .build()
            .map_err(|e| FeedError::Transport(format!("client init: {e}")))?;

        Ok(Self {
            client,
            session: Mutex::new(()),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latency_ns: AtomicU64::new(0),
        })
    }

    /// Build the vendor query URL for a symbol
    pub fn build_quote_url(endpoint: &str, symbol: Symbol, api_key: &str) -> String {
        format!("{endpoint}?function=GLOBAL_QUOTE&symbol={symbol}&apikey={api_key}")
    }

    /// Perform a GET, returning the body on HTTP 200 with a non-empty body
    ///
    /// All failure modes (timeout, non-2xx, transport, empty body) come
    /// back as [`FeedError::Transport`] and bump the failure counter.
    pub fn get(&self, url: &str) -> Result<String, FeedError> {
        let _session = self.session.lock();

        let start = Instant::now();
        let result = self.get_inner(url);
        let elapsed = start.elapsed().as_nanos() as u64;

        self.requests.fetch_add(1, Ordering::Relaxed);
        self.latency_ns.fetch_add(elapsed, Ordering::Relaxed);

        if let Err(ref e) = result {
            self.failures.fetch_add(1, Ordering::Relaxed);
            debug!(url, error = %e, "quote fetch failed");
        }
        result
    }

    fn get_inner(&self, url: &str) -> Result<String, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Transport(format!("http status {status}")));
        }

        let mut body = String::with_capacity(1024);
        response
            .take(MAX_RESPONSE_SIZE as u64)
            .read_to_string(&mut body)
            .map_err(|e| FeedError::Transport(format!("body read: {e}")))?;

        if body.is_empty() {
            return Err(FeedError::Transport("empty body".to_string()));
        }
        Ok(body)
    }

    /// Counter snapshot; never resets on read
    pub fn metrics(&self) -> FetcherMetrics {
        FetcherMetrics::derive(
            self.requests.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
            self.latency_ns.load(Ordering::Relaxed),
        )
    }

    pub fn reset_metrics(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.latency_ns.store(0, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        // The client either constructed or the fetcher does not exist; a
        // fetcher that is all failures is still "up" (vendor-side issue)
        let m = self.metrics();
        if m.requests == 0 {
            return true;
        }
        m.failures < m.requests
    }
}

impl std::fmt::Debug for QuoteFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = self.metrics();
        f.debug_struct("QuoteFetcher")
            .field("requests", &m.requests)
            .field("failures", &m.failures)
            .finish()
    }
}
