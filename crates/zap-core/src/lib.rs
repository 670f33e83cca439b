mod codec;
mod error;
mod events;
mod jid;
mod protocol;

pub use codec::{read_frame, write_frame};
pub use error::FrameError;
pub use events::*;
pub use jid::*;
pub use protocol::*;

/// Where `zapd` listens unless overridden on the command line.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/zapd.sock";
