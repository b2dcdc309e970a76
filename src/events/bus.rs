//! Event fan-out over bounded channels.
//!
//! Publishing never blocks the engine: a full subscriber loses the event (and
//! the drop is counted), a disconnected one is pruned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryIter, TrySendError};

use crate::error::RuntimeError;

use super::EngineEvent;

/// Receiving end of a subscription.
///
/// Dropping the stream unsubscribes; the bus prunes it on the next publish.
#[derive(Debug)]
pub struct EventStream {
    rx: Receiver<EngineEvent>,
}

impl EventStream {
    /// Receive the next event (blocking).
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Disconnected` once the engine is gone and the buffer is drained.
    pub fn recv(&self) -> Result<EngineEvent, RuntimeError> {
        self.rx.recv().map_err(|_| RuntimeError::Disconnected {
            channel: "event_stream".to_string(),
        })
    }

    /// Receive the next event with a timeout.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Timeout` if nothing arrives in time, or
    /// `RuntimeError::Disconnected` once the engine is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RuntimeError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => RuntimeError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            },
            RecvTimeoutError::Disconnected => RuntimeError::Disconnected {
                channel: "event_stream".to_string(),
            },
        })
    }

    /// Drain everything currently buffered without blocking.
    pub fn try_iter(&self) -> TryIter<'_, EngineEvent> {
        self.rx.try_iter()
    }

    /// Collect everything currently buffered.
    #[must_use]
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.rx.try_iter().collect()
    }
}

/// Publisher side: one sender per live subscriber.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    subscribers: Vec<Sender<EngineEvent>>,
    dropped_events: Arc<AtomicU64>,
}

impl EventBus {
    /// Creates a bus whose subscribers buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Vec::new(),
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Adds a subscriber.
    pub fn subscribe(&mut self) -> EventStream {
        let (tx, rx) = bounded::<EngineEvent>(self.capacity);
        self.subscribers.push(tx);
        EventStream { rx }
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&mut self, event: EngineEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        let dropped = &self.dropped_events;
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers (as of the last publish).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Events lost to full subscriber buffers.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
