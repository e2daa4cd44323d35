use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-flight guard for session refresh.
///
/// At most one request may run the refresh exchange at a time. Contenders do
/// not wait: `try_acquire` returns `None` and the caller proceeds with the
/// session it already has. The permit releases on drop, so the gate cannot
/// stay held past the refresh attempt even on an early return.
#[derive(Debug, Default)]
pub struct RefreshGate {
    refreshing: AtomicBool,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self {
            refreshing: AtomicBool::new(false),
        }
    }

    /// Attempt to take the gate. Returns `None` when another refresh is
    /// already in flight.
    pub fn try_acquire(self: &Arc<Self>) -> Option<RefreshPermit> {
        match self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(RefreshPermit {
                gate: Arc::clone(self),
            }),
            Err(_) => None,
        }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_held(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }
}

/// Exclusive right to refresh. Dropping it reopens the gate.
#[derive(Debug)]
pub struct RefreshPermit {
    gate: Arc<RefreshGate>,
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.gate.refreshing.store(false, Ordering::Release);
    }
}
