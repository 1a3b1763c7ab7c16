use serde::Deserialize;

/// App-level MQ configuration shared by producer and consumer.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Durable queue carrying decoded frames. Default: "p2000".
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
    /// Messages older than this are dropped by the broker. Default: 300.
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: u64,
    /// Fixed delay between broker connection attempts. Default: 5.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// How many times a requeued message is redelivered before the broker
    /// gives up on it. Default: 50.
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u8,
}

fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "p2000".into()
}
fn default_message_ttl_secs() -> u64 {
    300
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_max_redeliveries() -> u8 {
    50
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
            message_ttl_secs: default_message_ttl_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_redeliveries: default_max_redeliveries(),
        }
    }
}

/// Environment variable naming the config file (without extension).
pub const CONFIG_PATH_ENV: &str = "PAGER_CONFIG";
/// Prefix for environment overrides, e.g. `PAGER__MQ__URL`.
pub const ENV_PREFIX: &str = "PAGER";

/// Config file path, honoring [`CONFIG_PATH_ENV`].
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/config".to_string())
}
