//! Abstract interface for the pub/sub brokers backing a channel layer.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Brokers own topics and subscriptions and move messages between them.
pub mod broker;

/// Deliveries are handles to inbound messages, acknowledged once handled.
pub mod delivery;

/// Delivery handlers process inbound messages for subscriptions.
pub mod handler;

pub use broker::{Broker, BrokerError};
pub use delivery::Delivery;
pub use handler::{DeliveryHandler, DeliveryHandlerError};
