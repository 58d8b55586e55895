use super::{Acker, BusResult, Delivery, EventBus, MessageSource, Subscription};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_millis(200);

#[derive(Clone)]
struct Envelope {
    id: u64,
    payload: Bytes,
    attempt: u32,
}

/// One queue per (topic, group), shared by every member of the group.
#[derive(Clone)]
struct GroupQueue {
    tx: UnboundedSender<Envelope>,
    rx: Arc<tokio::sync::Mutex<UnboundedReceiver<Envelope>>>,
}

impl GroupQueue {
    fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

/// In-process event bus for single-node deployments and tests.
///
/// A nak'd message is requeued after the redelivery delay; a delivery dropped
/// without being settled is requeued immediately. Messages published to a topic
/// with no subscribed group are discarded.
pub struct InMemoryBus {
    topics: Mutex<HashMap<String, HashMap<String, GroupQueue>>>,
    next_id: AtomicU64,
    redelivery_delay: Duration,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            redelivery_delay: DEFAULT_REDELIVERY_DELAY,
        }
    }

    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    fn queue(&self, topic: &str, group: &str) -> GroupQueue {
        let mut topics = self
            .topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        topics
            .entry(topic.to_string())
            .or_default()
            .entry(group.to_string())
            .or_insert_with(GroupQueue::new)
            .clone()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        let envelope = Envelope {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            payload: Bytes::from(payload),
            attempt: 1,
        };

        let topics = self
            .topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match topics.get(topic) {
            Some(groups) if !groups.is_empty() => {
                for queue in groups.values() {
                    // The group keeps its receiver alive, so this cannot fail.
                    let _ = queue.tx.send(envelope.clone());
                }
            }
            _ => {
                tracing::debug!(
                    topic = %topic,
                    message_id = envelope.id,
                    "No subscribers, message dropped"
                );
            }
        }

        Ok(())
    }

    async fn subscribe(&self, topic: &str, group: &str) -> BusResult<Subscription> {
        let queue = self.queue(topic, group);
        let source = MemorySource {
            queue,
            redelivery_delay: self.redelivery_delay,
        };
        Ok(Subscription::new(topic, group, Box::new(source)))
    }
}

struct MemorySource {
    queue: GroupQueue,
    redelivery_delay: Duration,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next(&mut self) -> Option<BusResult<Delivery>> {
        let envelope = {
            let mut rx = self.queue.rx.lock().await;
            rx.recv().await?
        };

        let acker = MemoryAcker {
            requeue: self.queue.tx.clone(),
            envelope: envelope.clone(),
            redelivery_delay: self.redelivery_delay,
        };

        Some(Ok(Delivery::new(
            envelope.id.to_string(),
            envelope.payload,
            envelope.attempt,
            Box::new(acker),
        )))
    }

    async fn close(&mut self) {}
}

struct MemoryAcker {
    requeue: UnboundedSender<Envelope>,
    envelope: Envelope,
    redelivery_delay: Duration,
}

impl MemoryAcker {
    fn redelivered(self) -> (UnboundedSender<Envelope>, Envelope) {
        let mut envelope = self.envelope;
        envelope.attempt += 1;
        (self.requeue, envelope)
    }
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn ack(self: Box<Self>) -> BusResult<()> {
        Ok(())
    }

    async fn nak(self: Box<Self>) -> BusResult<()> {
        let delay = self.redelivery_delay;
        let (requeue, envelope) = self.redelivered();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = requeue.send(envelope);
        });
        Ok(())
    }

    fn abandon(self: Box<Self>) {
        let (requeue, envelope) = self.redelivered();
        let _ = requeue.send(envelope);
    }
}
