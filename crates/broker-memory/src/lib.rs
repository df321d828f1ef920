//! In-memory (single process) broker implementation for local development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};
use weft_broker::{Broker, Delivery, DeliveryHandler};

/// A delivery handed to subscription handlers by [`MemoryBroker`].
#[derive(Clone, Debug)]
pub struct MemoryDelivery {
    acked: Arc<AtomicBool>,
    attributes: HashMap<String, String>,
    payload: Bytes,
}

impl MemoryDelivery {
    fn new(payload: Bytes, attributes: HashMap<String, String>) -> Self {
        Self {
            acked: Arc::new(AtomicBool::new(false)),
            attributes,
            payload,
        }
    }

    /// Whether this delivery has been acknowledged.
    #[must_use]
    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Delivery for MemoryDelivery {
    type Error = Error;

    fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    fn payload(&self) -> &Bytes {
        &self.payload
    }

    async fn ack(&self) -> Result<(), Error> {
        self.acked.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
struct SubscriptionState {
    receiver: Option<mpsc::Receiver<MemoryDelivery>>,
    sender: mpsc::Sender<MemoryDelivery>,
    stop: Option<watch::Sender<()>>,
    topic: String,
}

/// In-memory broker.
///
/// Each subscription owns a bounded delivery queue; a full queue makes
/// [`Broker::publish`] fail with [`Error::Full`] after still delivering to
/// the remaining subscriptions on the topic.
#[derive(Clone, Debug)]
pub struct MemoryBroker {
    queue_capacity: usize,
    subscriptions: Arc<Mutex<HashMap<String, SubscriptionState>>>,
    topics: Arc<Mutex<HashMap<String, HashSet<String>>>>,
}

impl MemoryBroker {
    /// Creates a new `MemoryBroker` with the default queue capacity of 100.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_capacity(100)
    }

    /// Creates a new `MemoryBroker` whose subscription queues hold at most
    /// `capacity` undelivered messages.
    #[must_use]
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            queue_capacity: capacity.max(1),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The number of topics created so far.
    pub async fn topic_count(&self) -> usize {
        self.topics.lock().await.len()
    }

    /// The number of live subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.lock().await.len()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    type Error = Error;
    type Delivery = MemoryDelivery;

    async fn create_topic(&self, name: &str) -> Result<(), Error> {
        self.topics.lock().await.entry(name.to_string()).or_default();
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        attributes: HashMap<String, String>,
    ) -> Result<(), Error> {
        let bound: Vec<String> = {
            let topics = self.topics.lock().await;
            topics
                .get(topic)
                .ok_or_else(|| Error::UnknownTopic(topic.to_string()))?
                .iter()
                .cloned()
                .collect()
        };

        let mut full = false;
        let subscriptions = self.subscriptions.lock().await;
        for name in bound {
            if let Some(state) = subscriptions.get(&name) {
                let delivery = MemoryDelivery::new(payload.clone(), attributes.clone());
                match state.sender.try_send(delivery) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(subscription = %name, "delivery queue full, message not enqueued");
                        full = true;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }

        if full { Err(Error::Full) } else { Ok(()) }
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn create_subscription(&self, name: &str, topic: &str) -> Result<(), Error> {
        let mut topics = self.topics.lock().await;
        let bound = topics
            .get_mut(topic)
            .ok_or_else(|| Error::UnknownTopic(topic.to_string()))?;

        let mut subscriptions = self.subscriptions.lock().await;
        if subscriptions.contains_key(name) {
            return Err(Error::SubscriptionExists(name.to_string()));
        }

        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        bound.insert(name.to_string());
        subscriptions.insert(
            name.to_string(),
            SubscriptionState {
                receiver: Some(receiver),
                sender,
                stop: None,
                topic: topic.to_string(),
            },
        );

        Ok(())
    }

    async fn subscribe<X>(&self, subscription: &str, handler: X) -> Result<(), Error>
    where
        X: DeliveryHandler<MemoryDelivery>,
    {
        let mut subscriptions = self.subscriptions.lock().await;
        let state = subscriptions
            .get_mut(subscription)
            .ok_or_else(|| Error::UnknownSubscription(subscription.to_string()))?;

        let Some(mut receiver) = state.receiver.take() else {
            return Err(Error::AlreadySubscribed(subscription.to_string()));
        };

        let (stop_sender, mut stop_receiver) = watch::channel(());
        state.stop = Some(stop_sender);

        let name = subscription.to_string();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_receiver.changed() => {
                        break;
                    }
                    delivery = receiver.recv() => {
                        match delivery {
                            Some(delivery) => {
                                let _ = handler.handle(delivery).await;
                            }
                            None => break,
                        }
                    }
                }
            }
            debug!(subscription = %name, "delivery task stopped");
        });

        Ok(())
    }

    async fn delete_subscription(&self, name: &str) -> Result<(), Error> {
        let mut topics = self.topics.lock().await;
        let mut subscriptions = self.subscriptions.lock().await;

        let state = subscriptions
            .remove(name)
            .ok_or_else(|| Error::UnknownSubscription(name.to_string()))?;

        if let Some(bound) = topics.get_mut(&state.topic) {
            bound.remove(name);
        }
        if let Some(stop) = state.stop {
            let _ = stop.send(());
        }

        Ok(())
    }
}
