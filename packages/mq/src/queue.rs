use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::MqError;

/// One message handed out by a queue and not yet acknowledged.
#[derive(Debug, Clone)]
pub struct Delivery<H> {
    /// Broker-assigned message id.
    pub id: String,
    /// UTF-8 message body.
    pub body: String,
    /// How many times this message has been delivered, including this one.
    pub attempts: u8,
    pub(crate) handle: H,
}

/// A live connection to a durable queue broker.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Broker-specific state needed to settle a delivery.
    type Handle: Send + Sync;

    async fn publish(&self, queue: &str, body: &str) -> Result<(), MqError>;

    /// Wait for the next message. The message stays owned by this consumer
    /// until it is acknowledged or requeued.
    async fn consume(&self, queue: &str) -> Result<Delivery<Self::Handle>, MqError>;

    /// Remove a handled message from the queue for good.
    async fn ack(&self, queue: &str, delivery: Delivery<Self::Handle>) -> Result<(), MqError>;

    /// Hand a message back to the broker for redelivery.
    async fn requeue(&self, queue: &str, delivery: Delivery<Self::Handle>)
    -> Result<(), MqError>;

    /// Return every delivery on `queue` that was handed out but never
    /// settled, such as one held by a consumer that crashed or lost its
    /// connection, to the queue. Returns how many were returned.
    ///
    /// Deliveries held by other live consumers of `queue` are returned too
    /// and may be handled twice.
    async fn recover(&self, queue: &str) -> Result<u64, MqError>;
}

/// Builds broker connections; used again after every disconnect.
#[async_trait]
pub trait QueueConnector: Send + Sync {
    type Queue: MessageQueue;

    async fn connect(&self) -> Result<Self::Queue, MqError>;
}

/// Connect with a fixed delay between attempts and no attempt limit.
///
/// Returns `None` only when `cancel` fires before a connection succeeds.
pub async fn connect_with_retry<C: QueueConnector>(
    connector: &C,
    delay: Duration,
    cancel: &CancellationToken,
) -> Option<C::Queue> {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match connector.connect().await {
            Ok(queue) => {
                info!(attempt, "Connected to message broker");
                return Some(queue);
            }
            Err(e) => {
                warn!(
                    attempt,
                    error = %e,
                    retry_in_secs = delay.as_secs_f64(),
                    "Message broker unavailable, retrying"
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
