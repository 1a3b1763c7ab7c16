pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod publisher;

pub use error::ProducerError;
pub use publisher::{Producer, ProducerReport};
