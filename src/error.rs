//! Error types of the deck driver.
use thiserror::Error;

use crate::session::RemoteMode;

/// What went wrong with a single command/reply exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("transport accepted fewer bytes than the frame length")]
    TransportWriteShort,
    #[error("no reply bytes were buffered after the settle delay")]
    NoReply,
    #[error("reply does not start with the deck header")]
    BadHeader,
    #[error("reply does not end with the terminator")]
    BadTerminator,
    #[error("reply echoes an unexpected opcode")]
    UnexpectedOpcode,
    #[error("reply frame is malformed")]
    MalformedFrame,
}

/// A failed reply check, tagged with the command that issued it.
///
/// `code` is the command-specific diagnostic code: the earlier a check sits in
/// the command's table, the closer its code is to `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{command}: {kind} (code {code})")]
pub struct ReplyError {
    pub command: &'static str,
    pub kind: ErrorKind,
    pub code: i8,
}

impl ReplyError {
    pub fn new(command: &'static str, kind: ErrorKind, code: i8) -> Self {
        ReplyError {
            command,
            kind,
            code,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error("serial port failure")]
    Serial(#[from] serialport::Error),
    #[error("serial I/O failure")]
    Io(#[from] std::io::Error),
    #[error("invalid deck profile")]
    Profile(#[from] serde_yaml::Error),
    #[error("track numbers start at 1, got {0}")]
    InvalidTrack(u8),
    #[error("deck is not in remote mode (mode: {mode})")]
    NotRemote { mode: RemoteMode },
}

impl Error {
    /// The reply check that failed, if this error came from one.
    pub fn reply(&self) -> Option<&ReplyError> {
        match self {
            Error::Reply(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
