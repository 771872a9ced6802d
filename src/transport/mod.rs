//! Abstract deck transport interface.
use crate::error::Result;

pub use self::replay::ReplayTransport;
pub use self::serial::{SerialSettings, SerialTransport};

mod replay;
mod serial;

/// Abstraction of the byte link to the deck.
///
/// The deck replies on its own schedule, so reading is split into asking how
/// many bytes are buffered and taking exactly that many.
pub trait Transport {
    /// Returns the number of bytes the link accepted.
    fn write_raw(&mut self, raw: &[u8]) -> Result<usize>;
    fn bytes_available(&mut self) -> Result<usize>;
    fn read_raw(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Take everything currently buffered, possibly nothing.
    fn read_available(&mut self) -> Result<Vec<u8>> {
        match self.bytes_available()? {
            0 => Ok(Vec::new()),
            n => self.read_raw(n),
        }
    }
}
