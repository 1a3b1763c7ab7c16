use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to read decoder output: {0}")]
    Read(#[from] std::io::Error),

    #[error("Decoder pipeline exited")]
    DecoderExited,

    #[error("Failed to publish frame: {0}")]
    Publish(#[from] mq::MqError),
}

pub type Result<T> = std::result::Result<T, ProducerError>;
