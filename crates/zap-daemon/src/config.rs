use std::path::PathBuf;

use zap_core::DEFAULT_SOCKET_PATH;

/// How many times the supervisor tries the gateway before giving up and
/// taking the process down with it.
pub const GATEWAY_CONNECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub connect_attempts: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            connect_attempts: GATEWAY_CONNECT_ATTEMPTS,
        }
    }
}
