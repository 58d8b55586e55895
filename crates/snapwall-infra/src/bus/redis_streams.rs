//! Redis Streams event bus
//!
//! Each topic is a stream (`snapwall:{topic}`) and each queue group a consumer
//! group on it. New entries are read with `XREADGROUP`; entries left pending for
//! longer than `ack_wait` (nak'd, or owned by a consumer that died) are taken
//! over with `XAUTOCLAIM` before new work is read.

use super::{Acker, BusError, BusResult, Delivery, EventBus, MessageSource, Subscription};
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Value};
use std::time::Duration;
use uuid::Uuid;

const PAYLOAD_FIELD: &str = "payload";

#[derive(Debug, Clone)]
pub struct RedisBusConfig {
    /// Prefix for stream keys
    pub stream_prefix: String,
    /// How long a delivered message may stay unacknowledged before it is
    /// handed to another consumer.
    pub ack_wait: Duration,
    /// Upper bound for a single blocking read.
    pub block: Duration,
    /// Approximate cap on stream length.
    pub max_len: usize,
}

impl Default for RedisBusConfig {
    fn default() -> Self {
        Self {
            stream_prefix: "snapwall".to_string(),
            ack_wait: Duration::from_secs(30),
            block: Duration::from_secs(5),
            max_len: 100_000,
        }
    }
}

pub struct RedisStreamsBus {
    client: redis::Client,
    conn: ConnectionManager,
    config: RedisBusConfig,
}

impl RedisStreamsBus {
    pub async fn connect(url: &str, config: RedisBusConfig) -> BusResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        tracing::info!(stream_prefix = %config.stream_prefix, "Connected Redis event bus");
        Ok(Self {
            client,
            conn,
            config,
        })
    }

    fn stream_key(&self, topic: &str) -> String {
        stream_key(&self.config.stream_prefix, topic)
    }

    /// Create the consumer group (and stream) if missing.
    async fn ensure_group(&self, key: &str, group: &str) -> BusResult<()> {
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(key)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => {
                tracing::info!(stream = %key, group = %group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn stream_key(prefix: &str, topic: &str) -> String {
    format!("{}:{}", prefix, topic)
}

#[async_trait]
impl EventBus for RedisStreamsBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        let key = self.stream_key(topic);
        let mut conn = self.conn.clone();

        let entry_id: String = redis::cmd("XADD")
            .arg(&key)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.max_len)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload.as_slice())
            .query_async(&mut conn)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;

        tracing::debug!(
            stream = %key,
            entry_id = %entry_id,
            size_bytes = payload.len(),
            "Published message"
        );
        Ok(())
    }

    async fn subscribe(&self, topic: &str, group: &str) -> BusResult<Subscription> {
        let key = self.stream_key(topic);
        self.ensure_group(&key, group).await?;

        // Blocking reads hold their connection, so each subscription gets its own.
        let reader = self.client.get_multiplexed_async_connection().await?;
        let consumer = format!("{}-{}", group, Uuid::new_v4().simple());

        tracing::info!(stream = %key, group = %group, consumer = %consumer, "Subscribed");

        let source = RedisSource {
            reader,
            acks: self.conn.clone(),
            key,
            group: group.to_string(),
            consumer,
            ack_wait: self.config.ack_wait,
            block: self.config.block,
            claim_cursor: "0-0".to_string(),
        };
        Ok(Subscription::new(topic, group, Box::new(source)))
    }
}

struct RedisSource {
    reader: MultiplexedConnection,
    acks: ConnectionManager,
    key: String,
    group: String,
    consumer: String,
    ack_wait: Duration,
    block: Duration,
    claim_cursor: String,
}

impl RedisSource {
    fn delivery(&self, id: String, payload: Vec<u8>, attempt: u32) -> Delivery {
        let acker = RedisAcker {
            conn: self.acks.clone(),
            key: self.key.clone(),
            group: self.group.clone(),
            id: id.clone(),
        };
        Delivery::new(id, Bytes::from(payload), attempt, Box::new(acker))
    }

    /// Take over one entry that has been pending longer than `ack_wait`.
    async fn claim_stale(&mut self) -> BusResult<Option<Delivery>> {
        let reply: Value = redis::cmd("XAUTOCLAIM")
            .arg(&self.key)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(self.ack_wait.as_millis() as u64)
            .arg(&self.claim_cursor)
            .arg("COUNT")
            .arg(1)
            .query_async(&mut self.reader)
            .await?;

        let (cursor, entries) = parse_autoclaim(reply)?;
        self.claim_cursor = cursor;

        for (id, payload) in entries {
            match payload {
                Some(payload) => {
                    let attempt = self.delivery_count(&id).await.unwrap_or(2);
                    tracing::debug!(stream = %self.key, entry_id = %id, attempt, "Reclaimed pending entry");
                    return Ok(Some(self.delivery(id, payload, attempt)));
                }
                None => self.discard(&id).await,
            }
        }
        Ok(None)
    }

    async fn read_new(&mut self) -> BusResult<Option<Delivery>> {
        let opts = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(1)
            .block(self.block.as_millis() as usize);

        let reply: Option<StreamReadReply> = self
            .reader
            .xread_options(&[&self.key], &[">"], &opts)
            .await?;

        let Some(reply) = reply else {
            return Ok(None);
        };

        for entry in reply.keys.into_iter().flat_map(|k| k.ids) {
            match entry.get::<Vec<u8>>(PAYLOAD_FIELD) {
                Some(payload) => return Ok(Some(self.delivery(entry.id, payload, 1))),
                None => self.discard(&entry.id).await,
            }
        }
        Ok(None)
    }

    async fn delivery_count(&mut self, id: &str) -> Option<u32> {
        let rows: redis::RedisResult<Vec<(String, String, u64, u64)>> = redis::cmd("XPENDING")
            .arg(&self.key)
            .arg(&self.group)
            .arg(id)
            .arg(id)
            .arg(1)
            .query_async(&mut self.reader)
            .await;
        rows.ok()?.first().map(|row| row.3 as u32)
    }

    /// Acknowledge an entry that carries no payload so it is not claimed forever.
    async fn discard(&mut self, id: &str) {
        tracing::warn!(stream = %self.key, entry_id = %id, "Entry without payload, discarding");
        let acked: redis::RedisResult<i64> = redis::cmd("XACK")
            .arg(&self.key)
            .arg(&self.group)
            .arg(id)
            .query_async(&mut self.acks)
            .await;
        if let Err(e) = acked {
            tracing::warn!(stream = %self.key, entry_id = %id, error = %e, "XACK failed");
        }
    }
}

#[async_trait]
impl MessageSource for RedisSource {
    async fn next(&mut self) -> Option<BusResult<Delivery>> {
        loop {
            match self.claim_stale().await {
                Ok(Some(delivery)) => return Some(Ok(delivery)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
            match self.read_new().await {
                Ok(Some(delivery)) => return Some(Ok(delivery)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn close(&mut self) {
        // Pending entries stay with the group and are reclaimed by other consumers.
        tracing::debug!(stream = %self.key, consumer = %self.consumer, "Consumer leaving group");
    }
}

struct RedisAcker {
    conn: ConnectionManager,
    key: String,
    group: String,
    id: String,
}

#[async_trait]
impl Acker for RedisAcker {
    async fn ack(self: Box<Self>) -> BusResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("XACK")
            .arg(&self.key)
            .arg(&self.group)
            .arg(&self.id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn nak(self: Box<Self>) -> BusResult<()> {
        // The entry stays pending and is reclaimed once it has idled for ack_wait.
        tracing::debug!(stream = %self.key, entry_id = %self.id, "Nak, awaiting reclaim");
        Ok(())
    }

    fn abandon(self: Box<Self>) {}
}

type ClaimedEntry = (String, Option<Vec<u8>>);

/// Parse an `XAUTOCLAIM` reply: `[next_cursor, [[id, [field, value, ...]], ...], ...]`.
fn parse_autoclaim(reply: Value) -> BusResult<(String, Vec<ClaimedEntry>)> {
    let mut items = match reply {
        Value::Bulk(items) => items.into_iter(),
        other => {
            return Err(BusError::Receive(format!(
                "unexpected XAUTOCLAIM reply: {:?}",
                other
            )))
        }
    };

    let cursor: String = match items.next() {
        Some(value) => redis::from_redis_value(&value)?,
        None => return Err(BusError::Receive("empty XAUTOCLAIM reply".to_string())),
    };

    let entries = match items.next() {
        Some(Value::Bulk(entries)) => entries,
        _ => Vec::new(),
    };

    let mut claimed = Vec::with_capacity(entries.len());
    for entry in entries {
        // Entries deleted from the stream come back as nil.
        if matches!(entry, Value::Nil) {
            continue;
        }
        let (id, fields): (String, Vec<Vec<u8>>) = redis::from_redis_value(&entry)?;
        let payload = fields
            .chunks(2)
            .find(|pair| pair.len() == 2 && pair[0] == PAYLOAD_FIELD.as_bytes())
            .map(|pair| pair[1].clone());
        claimed.push((id, payload));
    }

    Ok((cursor, claimed))
}
