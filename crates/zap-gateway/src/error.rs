use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gateway not connected")]
    NotConnected,

    #[error("failed to spawn bridge process: {0}")]
    SpawnFailed(String),

    #[error("could not connect to the messaging service: {0}")]
    ConnectFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("bridge channel closed")]
    ChannelClosed,

    #[error("timed out waiting for the bridge")]
    Timeout,

    #[error("{0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
