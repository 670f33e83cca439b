use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] zap_core::FrameError),

    #[error(transparent)]
    Store(#[from] zap_db::StoreError),

    #[error(transparent)]
    Gateway(#[from] zap_gateway::GatewayError),

    #[error("gateway unreachable after {attempts} connect attempts")]
    GatewayUnreachable { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, DaemonError>;
