use async_trait::async_trait;
pub use broccoli_queue::{brokers::broker::BrokerMessage, queue::BroccoliQueue};
use redis::Script;
use serde_json::Value;

use crate::config::{PublishConfig, consume_config, publish_config, redelivery_strategy};
use crate::error::MqError;
use crate::queue::{Delivery, MessageQueue, QueueConnector};

pub type MqQueue = BroccoliQueue;

#[derive(Debug, Clone)]
pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
    pub message_ttl_secs: u64,
    pub max_redeliveries: u8,
}

pub async fn init_mq(config: &MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .failed_message_retry_strategy(redelivery_strategy(config.max_redeliveries))
        .build()
        .await
        .map_err(|e| MqError::Connection(e.to_string()))
}

/// Moves every id on the processing list (KEYS[2]) back onto the queue
/// (KEYS[1]) with the score broccoli gives a fresh publish. Ids whose task
/// hash has expired are dropped.
const RECOVER_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local recovered = 0
while true do
    local id = redis.call('RPOP', KEYS[2])
    if not id then
        break
    end
    if redis.call('EXISTS', id) == 1 then
        local priority = tonumber(redis.call('HGET', id, 'priority')) or 5
        redis.call('ZADD', KEYS[1], priority * now, id)
        recovered = recovered + 1
    end
end
return recovered
"#;

fn processing_key(queue: &str) -> String {
    format!("{queue}_processing")
}

/// Broccoli counts failed deliveries; a [`Delivery`] counts this one too.
fn delivery_attempts(failed: u8) -> u8 {
    failed.saturating_add(1)
}

/// Redis-backed queue connection.
pub struct BroccoliMq {
    queue: MqQueue,
    publish: PublishConfig,
    client: redis::Client,
}

impl BroccoliMq {
    pub async fn connect(config: &MqConfig) -> Result<Self, MqError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| MqError::Connection(e.to_string()))?;
        Ok(Self {
            queue: init_mq(config).await?,
            publish: publish_config(config.message_ttl_secs),
            client,
        })
    }
}

/// Payloads are published as JSON strings; a publisher that sent a JSON
/// document instead gets its document text back.
fn body_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl MessageQueue for BroccoliMq {
    type Handle = BrokerMessage<Value>;

    async fn publish(&self, queue: &str, body: &str) -> Result<(), MqError> {
        self.queue
            .publish(queue, None, &body.to_string(), Some(self.publish.clone()))
            .await
            .map_err(|e| MqError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Delivery<Self::Handle>, MqError> {
        let message = self
            .queue
            .consume::<Value>(queue, Some(consume_config()))
            .await
            .map_err(|e| MqError::Consume(e.to_string()))?;

        Ok(Delivery {
            id: message.task_id.to_string(),
            body: body_text(&message.payload),
            attempts: delivery_attempts(message.attempts),
            handle: message,
        })
    }

    async fn ack(&self, queue: &str, delivery: Delivery<Self::Handle>) -> Result<(), MqError> {
        self.queue
            .acknowledge(queue, delivery.handle)
            .await
            .map_err(|e| MqError::Ack(e.to_string()))
    }

    async fn requeue(
        &self,
        queue: &str,
        delivery: Delivery<Self::Handle>,
    ) -> Result<(), MqError> {
        self.queue
            .reject(queue, delivery.handle)
            .await
            .map_err(|e| MqError::Ack(e.to_string()))
    }

    async fn recover(&self, queue: &str) -> Result<u64, MqError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| MqError::Connection(e.to_string()))?;

        Script::new(RECOVER_SCRIPT)
            .key(queue)
            .key(processing_key(queue))
            .arg(time::OffsetDateTime::now_utc().unix_timestamp_nanos() as f64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| MqError::Recover(e.to_string()))
    }
}

/// Opens a fresh [`BroccoliMq`] on every call.
#[derive(Debug, Clone)]
pub struct BroccoliConnector {
    config: MqConfig,
}

impl BroccoliConnector {
    pub fn new(config: MqConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl QueueConnector for BroccoliConnector {
    type Queue = BroccoliMq;

    async fn connect(&self) -> Result<Self::Queue, MqError> {
        BroccoliMq::connect(&self.config).await
    }
}
