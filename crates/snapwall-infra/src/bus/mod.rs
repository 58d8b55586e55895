//! Event bus
//!
//! Topic-based publish/subscribe with queue groups: every group subscribed to a
//! topic receives each message once, and within a group a message goes to one
//! subscription. Delivery is at-least-once. A [`Delivery`] must be settled with
//! [`Delivery::ack`] or [`Delivery::nak`]; dropping it unsettled hands the message
//! back to the bus.

mod memory;
mod redis_streams;

pub use memory::InMemoryBus;
pub use redis_streams::{RedisBusConfig, RedisStreamsBus};

use async_trait::async_trait;
use bytes::Bytes;
use snapwall_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Subscription closed")]
    Closed,

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl BusError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

pub type BusResult<T> = Result<T, BusError>;

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Fire-and-forget publish. An error means the message could not be handed
    /// to the bus, not that nobody received it.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Join queue group `group` on `topic`.
    async fn subscribe(&self, topic: &str, group: &str) -> BusResult<Subscription>;
}

/// Backend half of a [`Subscription`].
#[async_trait]
pub(crate) trait MessageSource: Send {
    async fn next(&mut self) -> Option<BusResult<Delivery>>;
    async fn close(&mut self);
}

/// Backend half of a [`Delivery`], consumed when the message is settled.
#[async_trait]
pub(crate) trait Acker: Send + Sync {
    async fn ack(self: Box<Self>) -> BusResult<()>;
    async fn nak(self: Box<Self>) -> BusResult<()>;
    /// Called from `Drop` when the delivery was never settled.
    fn abandon(self: Box<Self>);
}

/// A consumer's membership in a queue group.
pub struct Subscription {
    topic: String,
    group: String,
    source: Box<dyn MessageSource>,
}

impl Subscription {
    pub(crate) fn new(topic: &str, group: &str, source: Box<dyn MessageSource>) -> Self {
        Self {
            topic: topic.to_string(),
            group: group.to_string(),
            source,
        }
    }

    /// Wait for the next message. `None` once the subscription is closed.
    ///
    /// Cancel-safe: dropping the returned future before it completes loses no message.
    pub async fn next(&mut self) -> Option<BusResult<Delivery>> {
        self.source.next().await
    }

    /// Leave the queue group. Unsettled deliveries are redelivered to other members.
    pub async fn close(mut self) {
        self.source.close().await;
        tracing::debug!(topic = %self.topic, group = %self.group, "Subscription closed");
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

/// One received message.
pub struct Delivery {
    id: String,
    payload: Bytes,
    attempt: u32,
    acker: Option<Box<dyn Acker>>,
}

impl Delivery {
    pub(crate) fn new(id: String, payload: Bytes, attempt: u32, acker: Box<dyn Acker>) -> Self {
        Self {
            id,
            payload,
            attempt,
            acker: Some(acker),
        }
    }

    /// Bus-assigned message id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 1 for the first delivery, incremented on every redelivery.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }

    /// Confirm successful processing.
    pub async fn ack(mut self) -> BusResult<()> {
        match self.acker.take() {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        }
    }

    /// Report failed processing; the message will be redelivered.
    pub async fn nak(mut self) -> BusResult<()> {
        match self.acker.take() {
            Some(acker) => acker.nak().await,
            None => Ok(()),
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(acker) = self.acker.take() {
            tracing::debug!(message_id = %self.id, "Delivery dropped unsettled");
            acker.abandon();
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("size_bytes", &self.payload.len())
            .field("attempt", &self.attempt)
            .finish()
    }
}
