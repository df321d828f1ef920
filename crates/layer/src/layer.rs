use crate::config::Config;
use crate::error::Error;
use crate::groups::GroupRegistry;
use crate::inbound::Inbound;
use crate::names;
use crate::registry::Registry;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use weft_broker::{Broker, BrokerError, Delivery};

/// Attribute key reserved for the layer's own use; messages carrying it are
/// rejected with [`Error::InvalidMessage`].
pub const RESERVED_CHANNEL_KEY: &str = "__weft_channel__";

/// The attribute mapping carried by every message.
pub type Attributes = HashMap<String, String>;

/// Channel layer facade over a pub/sub broker.
///
/// Channels are process-local lookup keys lazily mapped onto broker topics
/// (on first send) and subscriptions (on first receive). Groups fan a single
/// send out to every member channel. All state is owned by this value and
/// torn down by [`ChannelLayer::flush`]; clones share the same state.
#[derive(Clone, Debug)]
pub struct ChannelLayer<B>
where
    B: Broker,
{
    broker: B,
    config: Config,
    groups: Arc<Mutex<GroupRegistry>>,
    inbound: Arc<Inbound<B::Delivery>>,
    registry: Arc<Registry<B>>,
}

impl<B> ChannelLayer<B>
where
    B: Broker,
{
    /// Creates a layer over `broker` with the default configuration.
    #[must_use]
    pub fn new(broker: B) -> Self {
        Self::with_config(broker, Config::default())
    }

    /// Creates a layer over `broker` with the given configuration.
    #[must_use]
    pub fn with_config(broker: B, config: Config) -> Self {
        Self {
            groups: Arc::new(Mutex::new(GroupRegistry::new(config.group_expiry))),
            inbound: Arc::new(Inbound::new(&config)),
            registry: Arc::new(Registry::new(broker.clone())),
            broker,
            config,
        }
    }

    /// Sends a message onto the channel, resolving the backing topic on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannelName`] if the name fails validation,
    /// [`Error::InvalidMessage`] if the message carries the reserved
    /// attribute key, [`Error::ChannelFull`] on broker backpressure, and
    /// [`Error::Broker`] for any other broker failure. No retries are
    /// attempted.
    pub async fn send(&self, channel: &str, message: Attributes) -> Result<(), Error<B::Error>> {
        if !names::valid_channel_name(channel) {
            return Err(Error::InvalidChannelName(channel.to_string()));
        }
        if message.contains_key(RESERVED_CHANNEL_KEY) {
            return Err(Error::InvalidMessage(RESERVED_CHANNEL_KEY));
        }

        let topic = self.registry.resolve_topic(channel).await?;
        self.broker
            .publish(&topic, Bytes::new(), message)
            .await
            .map_err(|error| {
                if error.is_full() {
                    Error::ChannelFull
                } else {
                    Error::Broker(error)
                }
            })
    }

    /// Receives the next message on the channel, resolving the backing
    /// subscription on first use and suspending until a message is pending.
    ///
    /// When several receivers wait on one channel, exactly one of them gets
    /// any given message; which one is unspecified. There is no built-in
    /// timeout; callers wanting one can wrap the future themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannelName`] if the name fails validation
    /// and [`Error::Broker`] if resolving the subscription or acknowledging
    /// the message fails.
    pub async fn receive(&self, channel: &str) -> Result<Attributes, Error<B::Error>> {
        if !names::valid_channel_name(channel) {
            return Err(Error::InvalidChannelName(channel.to_string()));
        }

        self.registry
            .resolve_subscription(channel, &self.inbound)
            .await?;

        loop {
            let (taken, expired) = self.inbound.collect(channel, self.config.expiry).await;
            for stale in expired {
                debug!(channel, "discarding expired buffered message");
                let _ = stale.ack().await;
            }
            if let Some(delivery) = taken {
                delivery.ack().await?;
                return Ok(delivery.attributes().clone());
            }

            let wakeup = self.inbound.wakeup(channel).await;
            wakeup.notified().await;
        }
    }

    /// Returns a fresh channel name under `prefix`, unique to this process.
    /// The name is not registered with the broker until first used.
    #[must_use]
    pub fn new_channel(&self, prefix: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        format!("{prefix}.channel.{suffix}")
    }

    /// Adds the channel to a group, recording the join time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] or [`Error::InvalidChannelName`]
    /// if either name fails validation; no state is touched in that case.
    pub async fn group_add(&self, group: &str, channel: &str) -> Result<(), Error<B::Error>> {
        if !names::valid_group_name(group) {
            return Err(Error::InvalidGroupName(group.to_string()));
        }
        if !names::valid_channel_name(channel) {
            return Err(Error::InvalidChannelName(channel.to_string()));
        }

        self.groups.lock().await.add(group, channel, Instant::now());
        Ok(())
    }

    /// Removes the channel from a group, regardless of how long ago it
    /// joined. A group left without members is removed entirely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] or [`Error::InvalidChannelName`]
    /// if either name fails validation.
    pub async fn group_discard(&self, group: &str, channel: &str) -> Result<(), Error<B::Error>> {
        if !names::valid_group_name(group) {
            return Err(Error::InvalidGroupName(group.to_string()));
        }
        if !names::valid_channel_name(channel) {
            return Err(Error::InvalidChannelName(channel.to_string()));
        }

        self.groups.lock().await.discard(group, channel);
        Ok(())
    }

    /// Sends a message to every current member of the group, evicting
    /// expired memberships first.
    ///
    /// Delivery is best-effort: a member whose channel is full is skipped
    /// without aborting delivery to the remaining members or reporting
    /// failure to the caller. There is no atomicity; partial delivery on
    /// other errors is expected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] if the name fails validation,
    /// [`Error::InvalidMessage`] if the message carries the reserved
    /// attribute key, and [`Error::Broker`] for non-backpressure broker
    /// failures.
    pub async fn group_send(&self, group: &str, message: Attributes) -> Result<(), Error<B::Error>> {
        if !names::valid_group_name(group) {
            return Err(Error::InvalidGroupName(group.to_string()));
        }
        if message.contains_key(RESERVED_CHANNEL_KEY) {
            return Err(Error::InvalidMessage(RESERVED_CHANNEL_KEY));
        }

        let members = {
            let mut groups = self.groups.lock().await;
            groups.sweep_expired(Instant::now());
            groups.members(group)
        };

        for channel in members {
            match self.send(&channel, message.clone()).await {
                Ok(()) => {}
                Err(Error::ChannelFull) => {
                    debug!(group, channel = %channel, "skipping full member channel");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Clears all channel, group, and buffer state and deletes every broker
    /// subscription this process created. Topics are intentionally left in
    /// place for other processes still using them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Broker`] if a subscription deletion fails.
    pub async fn flush(&self) -> Result<(), Error<B::Error>> {
        let subscriptions = self.registry.drain().await;
        self.groups.lock().await.clear();
        self.inbound.clear().await;

        for name in subscriptions {
            self.broker.delete_subscription(&name).await?;
        }
        Ok(())
    }

    /// Releases process-local resources. Nothing is held beyond what
    /// [`ChannelLayer::flush`] handles, so this is a no-op.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub async fn close(&self) -> Result<(), Error<B::Error>> {
        Ok(())
    }
}
