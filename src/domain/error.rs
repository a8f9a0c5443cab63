use crate::app::ConfigError;
use crate::buffer::BufferError;
use crate::reliability::SinkError;
use crate::sender::ClientError;
use thiserror::Error;

/// Top-level error type for constructing and initializing the pipeline.
///
/// Delivery failures never surface here; once the pipeline runs, they are
/// retried and then persisted by the failure sink.
#[derive(Error, Debug)]
pub enum RemoteLogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Application name cannot be empty")]
    EmptyAppName,

    #[error("Collector error: {0}")]
    Client(#[from] ClientError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Failure sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Failed to start delivery worker: {0}")]
    Worker(std::io::Error),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}
