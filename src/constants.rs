//! Wire constants of the MDS RS-232 protocol.

/// First byte of every frame sent by the PC.
pub const HEADER_PC: u8 = 0x7e;
/// First byte of every frame sent by the deck.
pub const HEADER_DECK: u8 = 0x6f;
pub const FORMAT_TYPE: u8 = 0x05;
pub const CATEGORY: u8 = 0x47;
pub const TERMINATOR: u8 = 0xff;

/// header, length, format type, category, opcode major/minor, terminator
pub const FRAME_OVERHEAD: usize = 7;
pub const MAX_PAYLOAD_LEN: usize = 26;

/// Name bytes carried by one track-name write packet.
pub const NAME_CHUNK_LEN: usize = 16;
/// Longest name accepted before the end marker is appended.
pub const MAX_NAME_LEN: usize = 200;
/// Text in a name reply starts this many bytes after the frame header.
pub const TEXT_OFFSET: usize = 7;

/// Opcode-major values.
pub mod major {
    pub const SYSTEM: u8 = 0x10;
    pub const TRANSPORT: u8 = 0x02;
    pub const QUERY: u8 = 0x20;
}

/// Opcode-minor values, outgoing and as echoed by the deck.
pub mod minor {
    pub const REMOTE_ON: u8 = 0x03;
    pub const REMOTE_OFF: u8 = 0x04;

    pub const PLAY: u8 = 0x01;
    pub const STOP: u8 = 0x02;
    pub const REC: u8 = 0x21;
    pub const EJECT: u8 = 0x40;

    pub const MODEL_REQUEST: u8 = 0x10;
    pub const STATUS: u8 = 0x20;
    pub const DISC_DATA: u8 = 0x21;
    pub const MODEL_NAME: u8 = 0x22;
    pub const TOC_DATA: u8 = 0x44;
    pub const TOC_DATA_REPLY: u8 = 0x60;
    pub const DISC_NAME: u8 = 0x48;
    pub const NO_DISC_NAME: u8 = 0x85;
    pub const TRACK_NAME: u8 = 0x4a;
    pub const NO_TRACK_NAME: u8 = 0x86;
    pub const REC_REMAIN: u8 = 0x54;
    pub const TRACK_NAME_WRITE: u8 = 0x72;
    pub const TRACK_NAME_CONTINUE: u8 = 0x73;
    pub const NAME_ACCEPTED: u8 = 0x87;
}
