use thiserror::Error;
use weft_broker::BrokerError;

/// Errors surfaced by channel layer operations.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: BrokerError,
{
    /// The broker rejected an operation.
    #[error(transparent)]
    Broker(#[from] E),

    /// The broker or a channel buffer refused a message due to backpressure.
    #[error("channel at capacity")]
    ChannelFull,

    /// A channel name failed validation.
    #[error("invalid channel name {0:?}")]
    InvalidChannelName(String),

    /// A group name failed validation.
    #[error("invalid group name {0:?}")]
    InvalidGroupName(String),

    /// A message carried the layer's reserved attribute key.
    #[error("message carries reserved attribute key {0:?}")]
    InvalidMessage(&'static str),
}
