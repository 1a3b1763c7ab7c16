use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Consume failed: {0}")]
    Consume(String),

    #[error("Acknowledgment failed: {0}")]
    Ack(String),

    #[error("Recovery failed: {0}")]
    Recover(String),
}
