//! RAII guard for the active connection count
//!
//! Each served connection holds a guard; dropping it releases the slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts active connections against an optional limit
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl ConnectionTracker {
    /// Create a tracker; `None` means unlimited
    pub fn new(limit: Option<usize>) -> Self {
        ConnectionTracker {
            active: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    /// Claim a slot, or `None` when the limit is reached
    pub fn try_acquire(&self) -> Option<ConnectionGuard> {
        let claimed = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match self.limit {
                Some(limit) if n >= limit => None,
                _ => Some(n + 1),
            });

        claimed.ok().map(|_| ConnectionGuard {
            active: Arc::clone(&self.active),
        })
    }

    /// Connections currently holding a guard
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// Slot held for the lifetime of one connection
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
