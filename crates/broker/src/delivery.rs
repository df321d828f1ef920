use crate::broker::BrokerError;

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// A trait representing a handle to one inbound message.
///
/// The message exists from publish until a single successful acknowledgment;
/// an unacknowledged delivery may be presented again by the broker.
#[async_trait]
pub trait Delivery
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the delivery.
    type Error: BrokerError;

    /// The attribute mapping carried by the message.
    fn attributes(&self) -> &HashMap<String, String>;

    /// The message body.
    fn payload(&self) -> &Bytes;

    /// Acknowledges the message so the broker does not redeliver it.
    async fn ack(&self) -> Result<(), Self::Error>;
}
