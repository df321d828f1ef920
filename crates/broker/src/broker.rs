use crate::delivery::Delivery;
use crate::handler::DeliveryHandler;

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for broker errors.
pub trait BrokerError: Error + Send + Sync + 'static {
    /// Whether the broker rejected the operation due to backpressure.
    fn is_full(&self) -> bool {
        false
    }
}

/// A trait representing a pub/sub broker client.
///
/// Topics are durable publish targets shared by every process using the
/// broker. Subscriptions are receive endpoints bound to a single topic and
/// consumed by one process.
#[async_trait]
pub trait Broker
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the broker.
    type Error: BrokerError;

    /// The delivery handle passed to subscription handlers.
    type Delivery: Delivery<Error = Self::Error>;

    /// Creates the named topic. Callers resolve each topic at most once, but
    /// the broker must tolerate re-creation of an existing name.
    async fn create_topic(&self, name: &str) -> Result<(), Self::Error>;

    /// Publishes a message to the topic and awaits the broker's
    /// acknowledgment. Backpressure rejections surface as errors whose
    /// [`BrokerError::is_full`] is true.
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        attributes: HashMap<String, String>,
    ) -> Result<(), Self::Error>;

    /// Creates a subscription bound to the given topic.
    async fn create_subscription(&self, name: &str, topic: &str) -> Result<(), Self::Error>;

    /// Binds a delivery callback to the subscription. The handler is invoked
    /// once per inbound message, on an execution context the broker owns.
    async fn subscribe<X>(&self, subscription: &str, handler: X) -> Result<(), Self::Error>
    where
        X: DeliveryHandler<Self::Delivery>;

    /// Deletes the subscription, stopping delivery to its handler.
    async fn delete_subscription(&self, name: &str) -> Result<(), Self::Error>;
}
