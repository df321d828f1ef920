use crate::buffer::{DedupBuffer, PutOutcome, dedup_key};
use crate::config::{Config, OverflowPolicy};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use weft_broker::Delivery;

/// Per-channel inbound state shared between the facade and the delivery
/// listener.
///
/// The listener writes from whatever execution context the broker schedules
/// callbacks on, so both maps live behind locks. Buffers are created by the
/// first delivery for a channel, not by the consumer.
#[derive(Debug)]
pub(crate) struct Inbound<M> {
    buffers: Mutex<HashMap<String, DedupBuffer<M>>>,
    capacity: usize,
    overflow: OverflowPolicy,
    wakeups: Mutex<HashMap<String, Arc<Notify>>>,
}

impl<M> Inbound<M>
where
    M: Delivery,
{
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            buffers: Mutex::new(HashMap::new()),
            capacity: config.capacity,
            overflow: config.overflow,
            wakeups: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) const fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Buffers a delivery for the channel, creating the buffer on first use,
    /// and wakes one waiting receiver when something new is pending.
    pub(crate) async fn deposit(&self, channel: &str, delivery: M) -> PutOutcome<M> {
        let key = dedup_key(delivery.attributes());
        let outcome = {
            let mut buffers = self.buffers.lock().await;
            buffers
                .entry(channel.to_string())
                .or_insert_with(|| DedupBuffer::new(self.capacity, self.overflow))
                .put(key, delivery)
        };
        if matches!(outcome, PutOutcome::Enqueued | PutOutcome::Evicted(_)) {
            self.wakeup(channel).await.notify_one();
        }
        outcome
    }

    /// The channel's wakeup signal, created on first use by whichever side
    /// needs it first.
    pub(crate) async fn wakeup(&self, channel: &str) -> Arc<Notify> {
        self.wakeups
            .lock()
            .await
            .entry(channel.to_string())
            .or_default()
            .clone()
    }

    /// Atomically pops the oldest pending delivery, draining entries older
    /// than `max_age` first. Expired deliveries are handed back for the
    /// caller to settle.
    pub(crate) async fn collect(&self, channel: &str, max_age: Duration) -> (Option<M>, Vec<M>) {
        let (taken, expired, more_pending) = {
            let mut buffers = self.buffers.lock().await;
            match buffers.get_mut(channel) {
                Some(buffer) => {
                    let expired = buffer.sweep_expired(max_age);
                    let taken = buffer.take();
                    let more_pending = taken.is_some() && !buffer.is_empty();
                    (taken, expired, more_pending)
                }
                None => (None, Vec::new(), false),
            }
        };
        if more_pending {
            // Hand the turn to the next waiting receiver.
            self.wakeup(channel).await.notify_one();
        }
        (taken, expired)
    }

    /// Drops all buffers and wakeup signals. Receivers parked on an old
    /// signal are woken so they re-arm against fresh state.
    pub(crate) async fn clear(&self) {
        self.buffers.lock().await.clear();
        let mut wakeups = self.wakeups.lock().await;
        for wakeup in wakeups.values() {
            wakeup.notify_waiters();
        }
        wakeups.clear();
    }
}
