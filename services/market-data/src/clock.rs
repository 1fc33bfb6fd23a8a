//! Monotonic timestamps
//!
//! Snapshot timestamps count nanoseconds from a process-local monotonic
//! epoch, so they never go backwards under wall-clock adjustment.

use once_cell::sync::Lazy;
use std::time::Instant;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Nanoseconds since the process monotonic epoch
#[inline(always)]
pub fn now_ns() -> u64 {
    EPOCH.elapsed().as_nanos() as u64
}

/// Milliseconds since the process monotonic epoch
#[inline(always)]
pub fn now_millis() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}
