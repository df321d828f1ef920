use crate::inbound::Inbound;
use crate::listener::InboundListener;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;
use weft_broker::Broker;

/// Lazily-created broker entities backing each channel.
///
/// Each channel's topic and subscription live in a per-channel cell, so
/// concurrent resolvers for the same channel serialize on the cell rather
/// than on a registry-wide lock; exactly one of them creates the broker
/// entity and the rest observe its result.
#[derive(Debug)]
pub(crate) struct Registry<B>
where
    B: Broker,
{
    broker: B,
    subscriptions: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
    topics: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl<B> Registry<B>
where
    B: Broker,
{
    pub(crate) fn new(broker: B) -> Self {
        Self {
            broker,
            subscriptions: Mutex::new(HashMap::new()),
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the broker topic backing `channel`, creating it on first use.
    /// The topic is named deterministically after the channel.
    pub(crate) async fn resolve_topic(&self, channel: &str) -> Result<String, B::Error> {
        let cell = {
            let mut topics = self.topics.lock().await;
            topics.entry(channel.to_string()).or_default().clone()
        };
        let topic = cell
            .get_or_try_init(|| async {
                self.broker.create_topic(channel).await?;
                Ok(channel.to_string())
            })
            .await?;
        Ok(topic.clone())
    }

    /// Returns the subscription consuming `channel`, creating it and wiring
    /// the delivery listener on first use. The name carries a random suffix
    /// so concurrent processes receiving the same channel do not collide.
    pub(crate) async fn resolve_subscription(
        &self,
        channel: &str,
        inbound: &Arc<Inbound<B::Delivery>>,
    ) -> Result<String, B::Error> {
        let cell = {
            let mut subscriptions = self.subscriptions.lock().await;
            subscriptions.entry(channel.to_string()).or_default().clone()
        };
        let subscription = cell
            .get_or_try_init(|| async {
                let topic = self.resolve_topic(channel).await?;
                let name = format!("{channel}.sub.{}", Uuid::new_v4());
                self.broker.create_subscription(&name, &topic).await?;
                self.broker
                    .subscribe(
                        &name,
                        InboundListener::new(channel.to_string(), Arc::clone(inbound)),
                    )
                    .await?;
                Ok(name)
            })
            .await?;
        Ok(subscription.clone())
    }

    /// Empties the registry, returning every subscription created so far
    /// exactly once.
    pub(crate) async fn drain(&self) -> Vec<String> {
        self.topics.lock().await.clear();
        self.subscriptions
            .lock()
            .await
            .drain()
            .filter_map(|(_, cell)| cell.get().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;

    use weft_broker_memory::MemoryBroker;

    fn inbound() -> Arc<Inbound<weft_broker_memory::MemoryDelivery>> {
        Arc::new(Inbound::new(&Config::default()))
    }

    #[tokio::test]
    async fn concurrent_topic_resolution_creates_once() {
        let broker = MemoryBroker::new();
        let registry = Registry::new(broker.clone());

        let (a, b) = tokio::join!(
            registry.resolve_topic("room"),
            registry.resolve_topic("room"),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(broker.topic_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_subscription_resolution_creates_once() {
        let broker = MemoryBroker::new();
        let registry = Registry::new(broker.clone());
        let inbound = inbound();

        let (a, b) = tokio::join!(
            registry.resolve_subscription("room", &inbound),
            registry.resolve_subscription("room", &inbound),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(broker.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn distinct_channels_get_distinct_subscriptions() {
        let broker = MemoryBroker::new();
        let registry = Registry::new(broker.clone());
        let inbound = inbound();

        let a = registry.resolve_subscription("a", &inbound).await.unwrap();
        let b = registry.resolve_subscription("b", &inbound).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(broker.subscription_count().await, 2);
        assert_eq!(broker.topic_count().await, 2);
    }

    #[tokio::test]
    async fn drain_returns_each_subscription_once() {
        let broker = MemoryBroker::new();
        let registry = Registry::new(broker.clone());
        let inbound = inbound();

        let name = registry.resolve_subscription("room", &inbound).await.unwrap();

        assert_eq!(registry.drain().await, vec![name]);
        assert!(registry.drain().await.is_empty());
    }
}
