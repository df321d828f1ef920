use crate::delivery::Delivery;

use std::error::Error;

use async_trait::async_trait;

/// Marker trait for delivery handler errors.
pub trait DeliveryHandlerError: Error + Send + Sync + 'static {}

/// A trait representing a subscription's delivery callback.
#[async_trait]
pub trait DeliveryHandler<M>
where
    Self: Clone + Send + Sync + 'static,
    M: Delivery,
{
    /// The error type for the handler.
    type Error: DeliveryHandlerError;

    /// Handles the given delivery.
    async fn handle(&self, delivery: M) -> Result<(), Self::Error>;
}
