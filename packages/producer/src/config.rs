use std::time::Duration;

use common::config::{ENV_PREFIX, MqAppConfig, config_path};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Producer-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ProducerConfig {
    /// Identifier of this producer instance in logs. Default: "producer-1".
    #[serde(default = "default_producer_id")]
    pub id: String,
}

fn default_producer_id() -> String {
    "producer-1".into()
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            id: default_producer_id(),
        }
    }
}

/// The `rtl_fm | multimon-ng` pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct DecoderConfig {
    #[serde(default = "default_rtl_fm_bin")]
    pub rtl_fm_bin: String,
    #[serde(default = "default_multimon_bin")]
    pub multimon_bin: String,
    /// Tuner frequency as rtl_fm accepts it. Default: "169.65M".
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default = "default_gain")]
    pub gain: u32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// multimon-ng demodulator. Default: "FLEX".
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Output lines starting with one of these are decoder chatter, not frames.
    #[serde(default = "default_diagnostic_prefixes")]
    pub diagnostic_prefixes: Vec<String>,
}

fn default_rtl_fm_bin() -> String {
    "rtl_fm".into()
}
fn default_multimon_bin() -> String {
    "multimon-ng".into()
}
fn default_frequency() -> String {
    "169.65M".into()
}
fn default_gain() -> u32 {
    42
}
fn default_sample_rate() -> u32 {
    22050
}
fn default_protocol() -> String {
    "FLEX".into()
}
fn default_diagnostic_prefixes() -> Vec<String> {
    vec![
        "multimon-ng".into(),
        "(C)".into(),
        "Available demodulators".into(),
        "Enabled demodulators".into(),
    ]
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            rtl_fm_bin: default_rtl_fm_bin(),
            multimon_bin: default_multimon_bin(),
            frequency: default_frequency(),
            gain: default_gain(),
            sample_rate: default_sample_rate(),
            protocol: default_protocol(),
            diagnostic_prefixes: default_diagnostic_prefixes(),
        }
    }
}

impl DecoderConfig {
    pub fn rtl_fm_args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            self.frequency.clone(),
            "-M".into(),
            "fm".into(),
            "-s".into(),
            self.sample_rate.to_string(),
            "-g".into(),
            self.gain.to_string(),
        ]
    }

    pub fn multimon_args(&self) -> Vec<String> {
        vec![
            "-a".into(),
            self.protocol.clone(),
            "-t".into(),
            "raw".into(),
            "-".into(),
        ]
    }
}

/// Producer application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ProducerAppConfig {
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl ProducerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("producer.id", "producer-1")?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.queue_name", "p2000")?
            .add_source(File::with_name(&config_path()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("decoder.diagnostic_prefixes"),
            )
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

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.mq.reconnect_delay_secs)
    }
}
