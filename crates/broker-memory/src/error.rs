use thiserror::Error;
use weft_broker::BrokerError;

/// Errors that can occur in the in-memory broker.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The subscription's delivery queue was already claimed by a handler.
    #[error("subscription {0} already has an active handler")]
    AlreadySubscribed(String),

    /// A subscription's delivery queue is at capacity.
    #[error("subscription queue at capacity")]
    Full,

    /// The subscription name is already taken.
    #[error("subscription {0} already exists")]
    SubscriptionExists(String),

    /// No subscription with the given name exists.
    #[error("unknown subscription {0}")]
    UnknownSubscription(String),

    /// No topic with the given name exists.
    #[error("unknown topic {0}")]
    UnknownTopic(String),
}

impl BrokerError for Error {
    fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}
