//! Quote feed configuration

use std::time::Duration;

use types::symbol::Symbol;

/// Runtime configuration for the polling quote feed
///
/// May be changed while the scheduler is running; changes take effect at
/// the next sweep boundary.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Symbols polled each sweep
    pub symbols: Vec<Symbol>,
    /// Vendor credential, appended to every outgoing URL
    pub api_key: String,
    /// Vendor query endpoint
    pub endpoint: String,
    /// Sleep between sweeps
    pub update_interval: Duration,
    /// Minimum spacing between any two outgoing requests (vendor policy)
    pub min_update_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let symbols = ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN", "META", "NVDA", "NFLX"]
            .iter()
            .map(|s| Symbol::parse(s).expect("default symbols are valid"))
            .collect();

        Self {
            symbols,
            api_key: String::new(),
            endpoint: "https://www.alphavantage.co/query".to_string(),
            update_interval: Duration::from_millis(12),
            min_update_interval: Duration::from_millis(12),
        }
    }
}
