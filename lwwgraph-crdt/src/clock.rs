use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::timestamp::{get_unix_timestamp_ms, Timestamp};

/// A source of timestamps for add and remove events.
///
/// Every replica handle reads its clock at the time an operation is
/// applied, conflicts between replicas are then resolved purely by
/// comparing these timestamps.
pub trait Clock: Send + Sync + 'static {
    /// Returns the timestamp to record the current event with.
    ///
    /// Implementations should never return a timestamp lower than one
    /// they have previously handed out.
    fn now(&self) -> Timestamp;

    /// Registers a timestamp received from another replica.
    ///
    /// Every timestamp returned by [Clock::now] afterwards must be strictly
    /// greater than `ts`, otherwise local events could be ordered before
    /// events which have already been merged in.
    fn observe(&self, ts: Timestamp);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn observe(&self, ts: Timestamp) {
        (**self).observe(ts)
    }
}

/// The default wall clock backed timestamp source.
///
/// Combines the system time in milliseconds with a logical counter, so
/// that two events read from the same clock are always strictly ordered
/// even when the system clock has not advanced or has stepped backwards.
#[derive(Debug, Default)]
pub struct HybridClock {
    last: Mutex<Timestamp>,
}

impl HybridClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for HybridClock {
    fn now(&self) -> Timestamp {
        let mut last = self.last.lock();
        let next = last.tick(get_unix_timestamp_ms());
        *last = next;
        next
    }

    fn observe(&self, ts: Timestamp) {
        let mut last = self.last.lock();
        if ts > *last {
            *last = ts;
        }
    }
}

/// A deterministic clock which only moves when asked to.
///
/// Every call to [Clock::now] returns the next tick, which makes it
/// possible to construct exact event orderings across replicas by
/// sharing a single clock between them.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    /// Creates a new clock starting at the given tick.
    pub fn new(start: u64) -> Self {
        Self {
            ticks: AtomicU64::new(start),
        }
    }

    /// Moves the clock forward by `n` ticks without producing a timestamp.
    pub fn advance(&self, n: u64) {
        self.ticks.fetch_add(n, Ordering::SeqCst);
    }

    /// Sets the clock to the given tick, this may move the clock backwards.
    pub fn set(&self, millis: u64) {
        self.ticks.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let millis = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        Timestamp::new(millis, 0)
    }

    fn observe(&self, ts: Timestamp) {
        self.ticks.fetch_max(ts.millis(), Ordering::SeqCst);
    }
}
