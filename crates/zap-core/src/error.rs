use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("connection closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("bad arguments for '{command}': {reason}")]
    BadArgs {
        command: &'static str,
        reason: String,
    },
}

impl FrameError {
    /// Protocol errors abort the connection without a response frame;
    /// transport errors are already a dead connection.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            FrameError::Malformed(_) | FrameError::UnknownCommand(_) | FrameError::BadArgs { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
