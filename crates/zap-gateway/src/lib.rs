mod bridge;
mod error;
mod gateway;
mod media;
mod process;

pub use bridge::{BridgeConfig, BridgeGateway};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use media::classify_media;
