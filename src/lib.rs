//! Sony MDS RS-232 remote control protocol implementation.

pub mod constants;
pub mod device;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use self::device::DeckProfile;
pub use self::error::{Error, ErrorKind, ReplyError, Result};
pub use self::protocol::{Command, Response};
pub use self::session::{RemoteMode, Session};
pub use self::transport::Transport;
