//! Cooperative cancellation for bounded waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable cancellation handle. Cancellation is cooperative: pending
/// waits observe the flag between wait slices and wake with a
/// `Cancelled` result; in-flight native calls are not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Granularity at which condvar waits re-check cancellation.
pub(crate) const WAIT_SLICE: Duration = Duration::from_millis(20);

/// Time left until `deadline`, or `None` once it has passed.
pub(crate) fn time_left(deadline: Instant) -> Option<Duration> {
    let now = Instant::now();
    if now >= deadline {
        None
    } else {
        Some(deadline - now)
    }
}

/// The next wait slice: bounded by both the deadline and [`WAIT_SLICE`].
pub(crate) fn next_slice(deadline: Instant) -> Option<Duration> {
    time_left(deadline).map(|left| left.min(WAIT_SLICE))
}
