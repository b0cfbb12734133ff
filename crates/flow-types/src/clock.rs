use std::sync::atomic::{AtomicI64, Ordering};

use crate::document::TimestampMillis;

/// Source of ingestion timestamps.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> TimestampMillis;
}

/// Wall clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> TimestampMillis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Deterministic clock for tests.
///
/// Every reading returns the current value and then advances it by `step`,
/// so consecutive documents get distinct timestamps unless `step` is zero.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    step: i64,
}

impl ManualClock {
    /// A frozen clock: every reading returns `start` until moved explicitly.
    pub fn new(start: TimestampMillis) -> Self {
        Self::with_step(start, 0)
    }

    pub fn with_step(start: TimestampMillis, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step,
        }
    }

    pub fn set(&self, value: TimestampMillis) {
        self.now.store(value, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Current value without advancing.
    pub fn peek(&self) -> TimestampMillis {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> TimestampMillis {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}
