use std::time::Duration;

/// Behavior when a distinct message arrives while a channel's buffer is at
/// capacity. Duplicates of pending messages are always suppressed regardless
/// of policy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OverflowPolicy {
    /// Evict the oldest pending message to admit the newcomer.
    #[default]
    DropOldest,

    /// Discard the newcomer, acknowledging it to the broker.
    DropNewest,

    /// Leave the newcomer unacknowledged so the broker may redeliver it
    /// once capacity frees up.
    Reject,
}

/// Tunables for a channel layer instance.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of pending messages buffered per channel.
    pub capacity: usize,

    /// Maximum age of a buffered message before the receive path discards it.
    pub expiry: Duration,

    /// Maximum age of a group membership before the send path evicts it.
    pub group_expiry: Duration,

    /// Overflow behavior for a full channel buffer.
    pub overflow: OverflowPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 100,
            expiry: Duration::from_secs(60),
            group_expiry: Duration::from_secs(86_400),
            overflow: OverflowPolicy::default(),
        }
    }
}
