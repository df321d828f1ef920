use crate::buffer::PutOutcome;
use crate::config::OverflowPolicy;
use crate::inbound::Inbound;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use weft_broker::{Delivery, DeliveryHandler, DeliveryHandlerError};

/// Error type for the inbound delivery listener.
#[derive(Clone, Debug, Error)]
pub(crate) enum ListenerError {
    /// Failed to acknowledge a delivery that was discarded locally.
    #[error("failed to acknowledge discarded delivery")]
    Ack,
}

impl DeliveryHandlerError for ListenerError {}

/// Pushes broker deliveries into the owning channel's dedup buffer.
///
/// Invoked once per inbound message from the broker's own execution context.
/// Deliveries that will never reach a receiver (suppressed duplicates, drop
/// policy victims) are acknowledged here; enqueued deliveries are
/// acknowledged by the receiver that pops them.
#[derive(Debug)]
pub(crate) struct InboundListener<M>
where
    M: Delivery,
{
    channel: String,
    inbound: Arc<Inbound<M>>,
}

impl<M> Clone for InboundListener<M>
where
    M: Delivery,
{
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            inbound: Arc::clone(&self.inbound),
        }
    }
}

impl<M> InboundListener<M>
where
    M: Delivery,
{
    pub(crate) const fn new(channel: String, inbound: Arc<Inbound<M>>) -> Self {
        Self { channel, inbound }
    }
}

#[async_trait]
impl<M> DeliveryHandler<M> for InboundListener<M>
where
    M: Delivery,
{
    type Error = ListenerError;

    async fn handle(&self, delivery: M) -> Result<(), ListenerError> {
        match self.inbound.deposit(&self.channel, delivery).await {
            PutOutcome::Enqueued => Ok(()),
            PutOutcome::Duplicate(duplicate) => {
                debug!(channel = %self.channel, "suppressed duplicate delivery");
                duplicate.ack().await.map_err(|_| ListenerError::Ack)
            }
            PutOutcome::Evicted(oldest) => {
                warn!(channel = %self.channel, "buffer full, dropped oldest pending message");
                oldest.ack().await.map_err(|_| ListenerError::Ack)
            }
            PutOutcome::Rejected(newest) => {
                if self.inbound.overflow() == OverflowPolicy::DropNewest {
                    warn!(channel = %self.channel, "buffer full, dropped incoming message");
                    newest.ack().await.map_err(|_| ListenerError::Ack)
                } else {
                    warn!(channel = %self.channel, "buffer full, leaving delivery unacknowledged");
                    Ok(())
                }
            }
        }
    }
}
