//! # Reentrancy Guard
//!
//! Asset transfers run receiver hooks and refunds call external payment
//! endpoints, and either of those parties could try to call back into the
//! contract that invoked them before the original operation finishes. The
//! guard is the explicit per-instance lock that turns such a call into an
//! immediate error instead of a recursive state corruption.
//!
//! Every state-changing entry point does:
//!
//! ```ignore
//! let _permit = self.guard.enter()?;
//! ```
//!
//! The [`EntryPermit`] releases the lock on drop, so every exit path —
//! early `?` returns included — unlocks. This is deliberately independent
//! of anything the borrow checker already prevents: the protocol rule is
//! "reentrant calls fail with `Reentrant`", not "reentrant calls are
//! unrepresentable in this particular host language".

use std::cell::Cell;
use thiserror::Error;

/// Raised when a guarded entry point is entered while another guarded
/// operation on the same instance is still in flight.
#[derive(Debug, Error)]
#[error("reentrant call rejected")]
pub struct ReentrantCall;

/// Per-instance mutual-exclusion marker.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    /// A fresh, unlocked guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard, failing if it is already held.
    pub fn enter(&self) -> Result<EntryPermit<'_>, ReentrantCall> {
        if self.entered.replace(true) {
            return Err(ReentrantCall);
        }
        Ok(EntryPermit { guard: self })
    }
}

/// Proof of exclusive entry; releases the guard when dropped.
#[derive(Debug)]
pub struct EntryPermit<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for EntryPermit<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_enter_rejected_while_held() {
        let guard = ReentrancyGuard::new();
        let permit = guard.enter().unwrap();
        assert!(guard.enter().is_err());
        drop(permit);
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn released_on_error_paths() {
        let guard = ReentrancyGuard::new();

        // Simulate an entry point that fails partway through: the permit
        // is dropped by the early return, leaving the guard reusable.
        fn failing_op(guard: &ReentrancyGuard) -> Result<(), ReentrantCall> {
            let _permit = guard.enter()?;
            Err(ReentrantCall)
        }

        assert!(failing_op(&guard).is_err());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn sequential_operations_do_not_interfere() {
        let guard = ReentrancyGuard::new();
        for _ in 0..3 {
            let _permit = guard.enter().unwrap();
        }
    }
}
