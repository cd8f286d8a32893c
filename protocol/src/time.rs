//! # Time
//!
//! Credits expire, listings expire, and both record when things happened —
//! all in unix seconds, with `0` reserved to mean "never" or "not yet".
//! The contracts read the current time through the [`Clock`] trait so that
//! tests can travel: expiry-boundary and already-expired scenarios need a
//! clock that moves when told to, not when the wall does.
//!
//! [`SystemClock`] is the production clock; [`ManualClock`] is the test
//! clock, cheaply cloneable so a test can keep a handle after handing one
//! to a contract.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A source of the current unix timestamp in seconds.
pub trait Clock: Send + Sync {
    /// Current time, unix seconds.
    fn now(&self) -> u64;
}

/// Wall-clock time via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Negative unix timestamps would mean the host clock predates 1970;
        // clamp rather than wrap.
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// A settable clock for tests.
///
/// Clones share the same underlying instant, so advancing the handle a
/// test holds is visible to the contract that owns the other clone.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    pub fn at(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
