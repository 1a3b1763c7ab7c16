use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::FrameLayout;
pub use common::config::MqAppConfig;
use common::config::{ENV_PREFIX, config_path};

use crate::consumers::ConsumeSettings;

/// Consumer-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ConsumerConfig {
    /// Identifier of this consumer instance in logs. Default: "consumer-1".
    #[serde(default = "default_consumer_id")]
    pub id: String,
    /// Upper bound for a single store call. Default: 3000.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Base backoff before requeueing after a store failure. Default: 500.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Cap for the requeue backoff. Default: 5000.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Sweep unsettled deliveries back onto the queue after each broker
    /// connect. Default: true.
    #[serde(default = "default_recover_on_connect")]
    pub recover_on_connect: bool,
}

fn default_consumer_id() -> String {
    "consumer-1".into()
}
fn default_store_timeout_ms() -> u64 {
    3000
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_retry_max_delay_ms() -> u64 {
    5000
}
fn default_recover_on_connect() -> bool {
    true
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            id: default_consumer_id(),
            store_timeout_ms: default_store_timeout_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            recover_on_connect: default_recover_on_connect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// sea-orm connection URL. Default: "sqlite://p2000.db?mode=rwc".
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://p2000.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Consumer application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ConsumerAppConfig {
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub frame: FrameLayout,
}

impl ConsumerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("consumer.id", "consumer-1")?
            .set_default("database.url", default_database_url())?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.queue_name", "p2000")?
            .add_source(File::with_name(&config_path()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn mq_config(&self) -> mq::MqConfig {
        mq::MqConfig {
            url: self.mq.url.clone(),
            pool_size: self.mq.pool_size,
            message_ttl_secs: self.mq.message_ttl_secs,
            max_redeliveries: self.mq.max_redeliveries,
        }
    }

    pub fn consume_settings(&self) -> ConsumeSettings {
        ConsumeSettings {
            queue_name: self.mq.queue_name.clone(),
            reconnect_delay: Duration::from_secs(self.mq.reconnect_delay_secs),
            retry_base_delay_ms: self.consumer.retry_base_delay_ms,
            retry_max_delay_ms: self.consumer.retry_max_delay_ms,
            recover_on_connect: self.consumer.recover_on_connect,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.consumer.store_timeout_ms)
    }
}
