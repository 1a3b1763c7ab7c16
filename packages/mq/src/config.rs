use time::Duration;

pub type PublishConfig = broccoli_queue::queue::PublishOptions;
pub type ConsumeConfig = broccoli_queue::queue::ConsumeOptions;
pub type RetryStrategy = broccoli_queue::queue::RetryStrategy;

/// Publish options for frame messages: expire after `ttl_secs` so a long
/// store outage cannot grow the backlog without bound.
pub fn publish_config(ttl_secs: u64) -> PublishConfig {
    PublishConfig::builder()
        .ttl(Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64))
        .build()
}

/// Consume options with manual acknowledgment.
pub fn consume_config() -> ConsumeConfig {
    ConsumeConfig::builder().auto_ack(false).build()
}

/// Requeued messages go back on the queue up to `max_redeliveries` times.
pub fn redelivery_strategy(max_redeliveries: u8) -> RetryStrategy {
    RetryStrategy::new()
        .with_attempts(max_redeliveries)
        .retry_failed(true)
}
