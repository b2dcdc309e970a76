//! Time sources for the playback engine.
//!
//! The engine owns its clock. Scheduling uses a monotonic millisecond counter;
//! timeline timestamps use wall time. [`ManualClock`] only moves when told to,
//! which makes timer behavior deterministic in tests and fast-forward playback.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn now_ms(&self) -> u64;

    /// Current wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// A clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake time that advances only through [`ManualClock::advance`].
#[derive(Debug)]
pub struct ManualClock {
    base: DateTime<Utc>,
    elapsed_ms: AtomicU64,
}

impl ManualClock {
    /// Starts at zero elapsed time anchored to the current wall time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Starts at zero elapsed time anchored to `base`.
    #[must_use]
    pub const fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            elapsed_ms: AtomicU64::new(0),
        }
    }

    /// Moves time forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.elapsed_ms.fetch_add(ms, Ordering::AcqRel);
    }

    /// Moves time forward to `ms` if it is in the future.
    pub fn advance_to(&self, ms: u64) {
        self.elapsed_ms.fetch_max(ms, Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::Acquire)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let ms = i64::try_from(self.now_ms()).unwrap_or(i64::MAX);
        self.base
            .checked_add_signed(Duration::milliseconds(ms))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
