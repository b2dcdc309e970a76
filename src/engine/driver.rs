//! Playback driver: the processed-index watermark and the single pending
//! advancement timer.
//!
//! The driver does not sleep or spawn anything. A timer is a deadline on the
//! engine's clock; the engine checks it in `poll()`. Arming always replaces the
//! previous timer, and every timer carries a fresh token, so a superseded
//! deadline can never fire.

use serde::{Deserialize, Serialize};

/// A scheduled advancement past `step_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAdvance {
    /// Unique per arm call; never reused within a driver.
    pub token: u64,
    /// The step whose display time this timer measures.
    pub step_index: usize,
    /// Clock time (ms) at which the timer fires.
    pub due_at_ms: u64,
}

/// Watermark plus at most one pending timer.
#[derive(Debug, Default)]
pub struct PlaybackDriver {
    watermark: Option<usize>,
    pending: Option<PendingAdvance>,
    next_token: u64,
}

impl PlaybackDriver {
    /// A driver with nothing processed and no timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last processed step in this play.
    #[must_use]
    pub const fn watermark(&self) -> Option<usize> {
        self.watermark
    }

    /// Whether `index` still has to be processed.
    #[must_use]
    pub fn needs_processing(&self, index: usize) -> bool {
        self.watermark != Some(index)
    }

    /// Records `index` as processed for this play.
    pub fn mark_processed(&mut self, index: usize) {
        self.watermark = Some(index);
    }

    /// Replace any pending timer with a new one.
    pub fn arm(&mut self, step_index: usize, due_at_ms: u64) -> PendingAdvance {
        self.next_token = self.next_token.wrapping_add(1);
        let timer = PendingAdvance {
            token: self.next_token,
            step_index,
            due_at_ms,
        };
        if let Some(old) = self.pending.replace(timer) {
            tracing::trace!(token = old.token, "superseded pending advance");
        }
        timer
    }

    /// Drop the pending timer. Safe to call when none is pending.
    pub fn cancel(&mut self) -> Option<PendingAdvance> {
        self.pending.take()
    }

    /// The armed timer, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingAdvance> {
        self.pending.as_ref()
    }

    /// Take the pending timer if it is due at `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Option<PendingAdvance> {
        match self.pending {
            Some(timer) if now_ms >= timer.due_at_ms => self.pending.take(),
            _ => None,
        }
    }

    /// Forget the watermark and any pending timer. Tokens keep increasing.
    pub fn reset(&mut self) {
        self.watermark = None;
        self.pending = None;
    }
}

/// `duration_ms / speed`, rounded up. `speed` must be positive and finite.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn scaled_delay_ms(duration_ms: u64, speed: f64) -> u64 {
    if !speed.is_finite() || speed <= 0.0 {
        return duration_ms;
    }
    let scaled = (duration_ms as f64 / speed).ceil();
    if scaled >= u64::MAX as f64 {
        u64::MAX
    } else {
        scaled.max(0.0) as u64
    }
}
