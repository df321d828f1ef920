use crate::config::OverflowPolicy;

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

/// Canonical identity of a message: its attribute pairs in sorted order.
pub(crate) type DedupKey = Vec<(String, String)>;

/// Computes the dedup key for an attribute mapping.
pub(crate) fn dedup_key(attributes: &HashMap<String, String>) -> DedupKey {
    let mut pairs: Vec<(String, String)> = attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    pairs.sort();
    pairs
}

/// Result of offering an item to a [`DedupBuffer`].
#[derive(Debug)]
pub(crate) enum PutOutcome<M> {
    /// A value-equal item is already pending; the newcomer is handed back.
    Duplicate(M),

    /// The item is now pending.
    Enqueued,

    /// The item is now pending; the oldest pending item was evicted to make
    /// room and is handed back.
    Evicted(M),

    /// The buffer is at capacity and the policy refused the newcomer.
    Rejected(M),
}

#[derive(Debug)]
struct Entry<M> {
    arrived: Instant,
    item: M,
    key: DedupKey,
}

/// Bounded, insertion-ordered queue of pending items that suppresses
/// duplicate enqueue of value-equal items.
///
/// Membership is tracked in a hash set of canonical keys, so duplicate
/// checks do not scan the queue.
#[derive(Debug)]
pub(crate) struct DedupBuffer<M> {
    capacity: usize,
    entries: VecDeque<Entry<M>>,
    pending: HashSet<DedupKey>,
    policy: OverflowPolicy,
}

impl<M> DedupBuffer<M> {
    pub(crate) fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            pending: HashSet::new(),
            policy,
        }
    }

    /// Offers an item under the given key, applying dedup and the overflow
    /// policy.
    pub(crate) fn put(&mut self, key: DedupKey, item: M) -> PutOutcome<M> {
        if self.pending.contains(&key) {
            return PutOutcome::Duplicate(item);
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    if let Some(oldest) = self.entries.pop_front() {
                        self.pending.remove(&oldest.key);
                        evicted = Some(oldest.item);
                    }
                }
                OverflowPolicy::DropNewest | OverflowPolicy::Reject => {
                    return PutOutcome::Rejected(item);
                }
            }
        }

        self.pending.insert(key.clone());
        self.entries.push_back(Entry {
            arrived: Instant::now(),
            item,
            key,
        });

        evicted.map_or(PutOutcome::Enqueued, PutOutcome::Evicted)
    }

    /// Removes and returns the oldest pending item.
    pub(crate) fn take(&mut self) -> Option<M> {
        self.entries.pop_front().map(|entry| {
            self.pending.remove(&entry.key);
            entry.item
        })
    }

    /// Drains items that have been pending longer than `max_age`.
    pub(crate) fn sweep_expired(&mut self, max_age: Duration) -> Vec<M> {
        let now = Instant::now();
        let mut expired = Vec::new();
        loop {
            let stale = self
                .entries
                .front()
                .is_some_and(|entry| now.duration_since(entry.arrived) > max_age);
            if !stale {
                break;
            }
            if let Some(entry) = self.entries.pop_front() {
                self.pending.remove(&entry.key);
                expired.push(entry.item);
            }
        }
        expired
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
