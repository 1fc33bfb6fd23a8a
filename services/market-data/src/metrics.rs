//! Feed observability snapshots
//!
//! Plain value structs derived from the relaxed counters the components
//! maintain. Reads never reset; rates are computed at snapshot time.

use crate::store::StoreStats;

/// Fetcher counter snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FetcherMetrics {
    pub requests: u64,
    pub failures: u64,
    pub cumulative_latency_ns: u64,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
}

impl FetcherMetrics {
    pub(crate) fn derive(requests: u64, failures: u64, latency_ns: u64) -> Self {
        let avg_latency_ms = if requests > 0 {
            (latency_ns / requests) as f64 / 1e6
        } else {
            0.0
        };
        let success_rate = if requests > 0 {
            (requests - failures) as f64 / requests as f64 * 100.0
        } else {
            0.0
        };
        Self {
            requests,
            failures,
            cumulative_latency_ns: latency_ns,
            avg_latency_ms,
            success_rate,
        }
    }
}

/// Scheduler counter snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerMetrics {
    pub total_updates: u64,
    pub failed_updates: u64,
    pub avg_latency_ms: f64,
    pub updates_per_second: f64,
    pub success_rate: f64,
    pub uptime_seconds: f64,
}

impl SchedulerMetrics {
    pub(crate) fn derive(total: u64, failed: u64, latency_ns: u64, uptime_seconds: f64) -> Self {
        let attempts = total + failed;
        let avg_latency_ms = if attempts > 0 {
            (latency_ns / attempts) as f64 / 1e6
        } else {
            0.0
        };
        let updates_per_second = if uptime_seconds > 0.0 {
            total as f64 / uptime_seconds
        } else {
            0.0
        };
        let success_rate = if attempts > 0 {
            total as f64 / attempts as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_updates: total,
            failed_updates: failed,
            avg_latency_ms,
            updates_per_second,
            success_rate,
            uptime_seconds,
        }
    }
}

/// Combined feed metrics for external reporting
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedMetrics {
    pub scheduler: SchedulerMetrics,
    pub fetcher: FetcherMetrics,
    pub store: StoreStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_metrics_derivation() {
        let m = FetcherMetrics::derive(10, 2, 50_000_000);
        assert_eq!(m.requests, 10);
        assert_eq!(m.failures, 2);
        assert!((m.avg_latency_ms - 5.0).abs() < 1e-9);
        assert!((m.success_rate - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_fetcher_metrics_zero_requests() {
        let m = FetcherMetrics::derive(0, 0, 0);
        assert_eq!(m.avg_latency_ms, 0.0);
        assert_eq!(m.success_rate, 0.0);
    }

    #[test]
    fn test_scheduler_metrics_derivation() {
        let m = SchedulerMetrics::derive(90, 10, 100_000_000, 10.0);
        assert_eq!(m.total_updates, 90);
        assert_eq!(m.failed_updates, 10);
        assert!((m.updates_per_second - 9.0).abs() < 1e-9);
        assert!((m.success_rate - 90.0).abs() < 1e-9);
        assert!((m.avg_latency_ms - 1.0).abs() < 1e-9);
    }
}
