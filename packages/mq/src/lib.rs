pub mod config;
pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod models;
pub mod queue;

pub use config::ConsumeConfig;
pub use error::MqError;
#[cfg(any(test, feature = "memory"))]
pub use memory::{MemoryBroker, MemoryQueue};
pub use models::{BroccoliConnector, BroccoliMq, MqConfig, init_mq};
pub use queue::{Delivery, MessageQueue, QueueConnector, connect_with_retry};
