//! Streaming manager: channel registry and fan-out

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::StreamingConfig;
use super::message::StreamMessage;
use crate::metrics::BACKPLANE_METRICS;

/// A single named channel and its live subscribers
struct StreamChannel {
    name: String,
    subscribers: RwLock<HashMap<Uuid, mpsc::UnboundedSender<StreamMessage>>>,
    messages: AtomicU64,
}

impl StreamChannel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: RwLock::new(HashMap::new()),
            messages: AtomicU64::new(0),
        }
    }

    fn add_subscriber(&self, id: Uuid, tx: mpsc::UnboundedSender<StreamMessage>) {
        let count = {
            let mut subscribers = self.subscribers.write();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        BACKPLANE_METRICS
            .stream_subscribers
            .with_label_values(&[&self.name])
            .set(count as f64);
    }

    fn remove_subscriber(&self, id: Uuid) {
        let count = {
            let mut subscribers = self.subscribers.write();
            subscribers.remove(&id);
            subscribers.len()
        };
        BACKPLANE_METRICS
            .stream_subscribers
            .with_label_values(&[&self.name])
            .set(count as f64);
    }

    fn clear_subscribers(&self) -> usize {
        let dropped = {
            let mut subscribers = self.subscribers.write();
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        BACKPLANE_METRICS
            .stream_subscribers
            .with_label_values(&[&self.name])
            .set(0.0);
        dropped
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Deliver a message to every current subscriber, pruning any whose
    /// receiver has gone away. Returns the delivered count.
    fn publish(&self, message: &StreamMessage) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (id, tx) in subscribers.iter() {
                if tx.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let count = {
                let mut subscribers = self.subscribers.write();
                for id in dead {
                    subscribers.remove(&id);
                }
                subscribers.len()
            };
            BACKPLANE_METRICS
                .stream_subscribers
                .with_label_values(&[&self.name])
                .set(count as f64);
        }

        self.messages.fetch_add(1, Ordering::Relaxed);
        delivered
    }
}

type MessageFilter = Box<dyn Fn(&StreamMessage) -> bool + Send>;

/// A live subscription to one channel.
///
/// Yields every message published after the subscription was taken. Dropping
/// the subscription unsubscribes immediately; once its channel is destroyed
/// the stream terminates.
pub struct Subscription {
    id: Uuid,
    channel: Weak<StreamChannel>,
    rx: UnboundedReceiverStream<StreamMessage>,
    filter: Option<MessageFilter>,
}

impl Subscription {
    fn attached(channel: &Arc<StreamChannel>) -> Self {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        channel.add_subscriber(id, tx);
        Self {
            id,
            channel: Arc::downgrade(channel),
            rx: UnboundedReceiverStream::new(rx),
            filter: None,
        }
    }

    /// A subscription that yields nothing and is already terminated
    fn closed() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self {
            id: Uuid::new_v4(),
            channel: Weak::new(),
            rx: UnboundedReceiverStream::new(rx),
            filter: None,
        }
    }

    fn with_filter(mut self, filter: MessageFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl Stream for Subscription {
    type Item = StreamMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.rx).poll_next(cx) {
                Poll::Ready(Some(message)) => {
                    let keep = this
                        .filter
                        .as_ref()
                        .map_or(true, |predicate| predicate(&message));
                    if keep {
                        return Poll::Ready(Some(message));
                    }
                }
                other => return other,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.remove_subscriber(self.id);
        }
    }
}

/// Point-in-time streaming statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingMetrics {
    pub enabled: bool,
    pub total_channels: usize,
    pub total_messages: u64,
    pub channels: Vec<ChannelMetrics>,
}

/// Per-channel statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub name: String,
    /// Whether the channel currently has live subscribers
    pub active: bool,
    pub subscribers: usize,
    pub messages: u64,
}

/// Channel registry with manual fan-out.
///
/// Channels are owned by this instance; two managers never share state.
pub struct StreamingManager {
    config: StreamingConfig,
    channels: DashMap<String, Arc<StreamChannel>>,
}

impl StreamingManager {
    /// Create a new streaming manager with no channels registered.
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            channels: DashMap::new(),
        }
    }

    /// Create the configured channels.
    pub async fn initialize(&self) {
        if !self.config.enabled {
            info!("Streaming manager disabled");
            return;
        }

        for name in self.config.channels.clone() {
            self.create_channel(&name);
        }
        info!(
            channels = self.channels.len(),
            "Streaming manager initialized"
        );
    }

    /// Destroy every channel, completing all live subscriptions.
    pub async fn shutdown(&self) {
        let names: Vec<String> = self
            .channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for name in names {
            self.destroy_channel(&name);
        }
        info!("Streaming manager shut down");
    }

    /// Register a channel. Returns false when it already exists or the
    /// manager is disabled.
    pub fn create_channel(&self, name: &str) -> bool {
        if !self.config.enabled {
            debug!(channel = %name, "Streaming disabled; channel not created");
            return false;
        }
        if self.channels.contains_key(name) {
            warn!(channel = %name, "Channel already exists");
            return false;
        }
        self.channels
            .insert(name.to_string(), Arc::new(StreamChannel::new(name)));
        info!(channel = %name, "Channel created");
        true
    }

    /// Remove a channel. All its subscriptions terminate. Returns false when
    /// the channel is unknown.
    pub fn destroy_channel(&self, name: &str) -> bool {
        match self.channels.remove(name) {
            Some((_, channel)) => {
                let dropped = channel.clear_subscribers();
                info!(channel = %name, subscribers_dropped = dropped, "Channel destroyed");
                true
            }
            None => false,
        }
    }

    /// Publish a message to a channel's current subscribers. Returns false
    /// when the channel is unknown or the manager is disabled.
    pub fn publish(&self, channel: &str, data: Value, source: Option<&str>) -> bool {
        if !self.config.enabled {
            debug!(channel = %channel, "Streaming disabled; message dropped");
            return false;
        }

        let target = match self.channels.get(channel) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                warn!(channel = %channel, "Publish to unknown channel");
                return false;
            }
        };

        let message = StreamMessage::new(channel, data, source.map(str::to_string));
        let delivered = target.publish(&message);
        BACKPLANE_METRICS.record_publish(channel);
        debug!(
            channel = %channel,
            message_id = %message.id,
            delivered,
            "Message published"
        );
        true
    }

    /// Subscribe to a channel. An unknown channel (or a disabled manager)
    /// yields an already-terminated subscription.
    pub fn subscribe(&self, channel: &str) -> Subscription {
        if !self.config.enabled {
            debug!(channel = %channel, "Streaming disabled; returning closed subscription");
            return Subscription::closed();
        }

        match self.channels.get(channel) {
            Some(entry) => {
                let subscription = Subscription::attached(entry.value());
                debug!(channel = %channel, "Subscriber attached");
                subscription
            }
            None => {
                warn!(channel = %channel, "Subscribe to unknown channel");
                Subscription::closed()
            }
        }
    }

    /// Subscribe with a predicate; only matching messages are yielded.
    pub fn subscribe_filtered<F>(&self, channel: &str, predicate: F) -> Subscription
    where
        F: Fn(&StreamMessage) -> bool + Send + 'static,
    {
        self.subscribe(channel).with_filter(Box::new(predicate))
    }

    /// Subscribe to messages published by one source.
    pub fn subscribe_to_source(&self, channel: &str, source: &str) -> Subscription {
        let source = source.to_string();
        self.subscribe_filtered(channel, move |message| message.source == source)
    }

    /// Names of all registered channels.
    pub fn channels(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Whether a channel is registered.
    pub fn is_channel_active(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Live subscriber count for a channel; zero when unknown.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.channels
            .get(name)
            .map(|entry| entry.value().subscriber_count())
            .unwrap_or(0)
    }

    /// Snapshot of channel and message counts.
    pub fn metrics(&self) -> StreamingMetrics {
        let mut channels: Vec<ChannelMetrics> = self
            .channels
            .iter()
            .map(|entry| {
                let channel = entry.value();
                let subscribers = channel.subscriber_count();
                ChannelMetrics {
                    name: channel.name.clone(),
                    active: subscribers > 0,
                    subscribers,
                    messages: channel.message_count(),
                }
            })
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));

        StreamingMetrics {
            enabled: self.config.enabled,
            total_channels: channels.len(),
            total_messages: channels.iter().map(|c| c.messages).sum(),
            channels,
        }
    }
}
