//! The underlying binary protocol of the MDS RS-232 interface.
//!
//! Every frame is laid out as
//!
//! ```text
//! header | length | format type | category | opcode major | opcode minor | payload.. | terminator
//! ```
//!
//! The PC sends with header `0x7E`, the deck answers with header `0x6F`. One
//! read from the port may hold several reply frames back to back, so replies
//! are handled as a byte stream rather than a fixed record.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use bitfield::bitfield;
use scroll::Pread;
use serde::Serialize;

use crate::constants::{
    CATEGORY, FORMAT_TYPE, FRAME_OVERHEAD, HEADER_DECK, HEADER_PC, MAX_NAME_LEN, MAX_PAYLOAD_LEN,
    NAME_CHUNK_LEN, TERMINATOR, TEXT_OFFSET, major, minor,
};
use crate::error::{ErrorKind, ReplyError};

/// MDS deck command
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Lock the front panel and accept serial commands.
    RemoteOn,
    /// Hand control back to the front panel.
    RemoteOff,
    /// Model code request, the reply carries two fixed model bytes.
    ModelRequest,
    ModelName,
    Play,
    /// The deck does not answer when it is already stopped.
    Stop,
    Record,
    Eject,
    Status,
    TocData,
    DiscData,
    DiscName,
    RecRemain,
    /// Read the name of a track. The deck seeks first, so the reply is slow.
    TrackName { track: u8 },
    /// First packet of a track-name write, carrying the target track.
    TrackNameWrite { track: u8, chunk: Vec<u8> },
    /// Follow-up packet of a track-name write, carrying its packet number.
    TrackNameContinue { packet: u8, chunk: Vec<u8> },
}

impl Command {
    pub fn track_name(track: u8) -> Self {
        Command::TrackName { track }
    }

    /// Split a name into the packets of a track-name write.
    ///
    /// The encoded name always ends with a null byte, so an empty name still
    /// yields one packet and a name filling a whole chunk spills into a second.
    pub fn track_name_write(track: u8, name: &str) -> Vec<Self> {
        encode_name(name)
            .chunks(NAME_CHUNK_LEN)
            .enumerate()
            .map(|(i, chunk)| {
                if i == 0 {
                    Command::TrackNameWrite {
                        track,
                        chunk: chunk.to_vec(),
                    }
                } else {
                    Command::TrackNameContinue {
                        packet: (i + 1) as u8,
                        chunk: chunk.to_vec(),
                    }
                }
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::RemoteOn => "remote_on",
            Command::RemoteOff => "remote_off",
            Command::ModelRequest => "model_request",
            Command::ModelName => "model_name",
            Command::Play => "operation_play",
            Command::Stop => "operation_stop",
            Command::Record => "operation_rec",
            Command::Eject => "operation_eject",
            Command::Status => "status",
            Command::TocData => "toc_data",
            Command::DiscData => "disc_data",
            Command::DiscName => "disc_name",
            Command::RecRemain => "rec_remain",
            Command::TrackName { .. } => "track_name",
            Command::TrackNameWrite { .. } | Command::TrackNameContinue { .. } => {
                "track_name_write"
            }
        }
    }

    /// (opcode major, opcode minor)
    pub fn opcode(&self) -> (u8, u8) {
        match self {
            Command::RemoteOn => (major::SYSTEM, minor::REMOTE_ON),
            Command::RemoteOff => (major::SYSTEM, minor::REMOTE_OFF),
            Command::ModelRequest => (major::QUERY, minor::MODEL_REQUEST),
            Command::ModelName => (major::QUERY, minor::MODEL_NAME),
            Command::Play => (major::TRANSPORT, minor::PLAY),
            Command::Stop => (major::TRANSPORT, minor::STOP),
            Command::Record => (major::TRANSPORT, minor::REC),
            Command::Eject => (major::TRANSPORT, minor::EJECT),
            Command::Status => (major::QUERY, minor::STATUS),
            Command::TocData => (major::QUERY, minor::TOC_DATA),
            Command::DiscData => (major::QUERY, minor::DISC_DATA),
            Command::DiscName => (major::QUERY, minor::DISC_NAME),
            Command::RecRemain => (major::QUERY, minor::REC_REMAIN),
            Command::TrackName { .. } => (major::QUERY, minor::TRACK_NAME),
            Command::TrackNameWrite { .. } => (major::QUERY, minor::TRACK_NAME_WRITE),
            Command::TrackNameContinue { .. } => (major::QUERY, minor::TRACK_NAME_CONTINUE),
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            // TOC, disc name and rec remain all address the first entry
            Command::TocData | Command::DiscName | Command::RecRemain => vec![0x01],
            Command::TrackName { track } => vec![*track],
            Command::TrackNameWrite { track: lead, chunk }
            | Command::TrackNameContinue {
                packet: lead,
                chunk,
            } => {
                let mut buf = Vec::with_capacity(1 + chunk.len());
                buf.push(*lead);
                buf.extend_from_slice(chunk);
                buf
            }
            _ => Vec::new(),
        }
    }

    pub fn into_raw(self) -> Vec<u8> {
        let (opcode_major, opcode_minor) = self.opcode();
        build_command(opcode_major, opcode_minor, &self.payload())
    }
}

/// Frame a command for the deck.
///
/// The length byte counts format type, category, both opcode bytes and the
/// payload.
///
/// # Panics
///
/// Panics if `payload` is longer than [`MAX_PAYLOAD_LEN`] bytes.
pub fn build_command(opcode_major: u8, opcode_minor: u8, payload: &[u8]) -> Vec<u8> {
    assert!(
        payload.len() <= MAX_PAYLOAD_LEN,
        "payload of {} bytes exceeds {}",
        payload.len(),
        MAX_PAYLOAD_LEN
    );
    let mut buf = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    buf.extend_from_slice(&[
        HEADER_PC,
        payload.len() as u8 + 4,
        FORMAT_TYPE,
        CATEGORY,
        opcode_major,
        opcode_minor,
    ]);
    buf.extend_from_slice(payload);
    buf.push(TERMINATOR);
    buf
}

/// Checks shared by every reply: non-empty, deck header first, terminator last.
pub fn validate_reply(raw: &[u8]) -> Result<(), ErrorKind> {
    match (raw.first(), raw.last()) {
        (None, _) => Err(ErrorKind::NoReply),
        (Some(&b), _) if b != HEADER_DECK => Err(ErrorKind::BadHeader),
        (_, Some(&b)) if b != TERMINATOR => Err(ErrorKind::BadTerminator),
        _ => Ok(()),
    }
}

/// Everything the deck buffered after a command. May hold several frames.
#[derive(Clone, PartialEq, Eq)]
pub struct Response {
    command: &'static str,
    raw: Vec<u8>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.command, hex::encode(&self.raw))
    }
}

impl Response {
    pub fn new(command: &'static str, raw: Vec<u8>) -> Self {
        Response { command, raw }
    }

    pub fn command(&self) -> &'static str {
        self.command
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// See [`ReplyCheck::frame`].
    pub fn check(
        &self,
        header_code: i8,
        terminator_code: i8,
    ) -> Result<ReplyCheck<'_>, ReplyError> {
        ReplyCheck::frame(self.command, &self.raw, header_code, terminator_code)
    }
}

/// Position of a byte inside a reply buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum At {
    /// Offset from the first byte.
    Start(usize),
    /// Distance from the end, `End(1)` being the terminator.
    End(usize),
}

/// Command-specific checks layered on top of [`validate_reply`].
///
/// Every check carries the diagnostic code it reports on failure. A byte the
/// check needs but the reply is too short to hold fails as
/// [`ErrorKind::MalformedFrame`].
#[derive(Debug, Clone, Copy)]
pub struct ReplyCheck<'a> {
    command: &'static str,
    raw: &'a [u8],
}

impl<'a> ReplyCheck<'a> {
    /// Run the common checks. An empty reply or a bad header fails with
    /// `header_code`, a bad terminator with `terminator_code`.
    pub fn frame(
        command: &'static str,
        raw: &'a [u8],
        header_code: i8,
        terminator_code: i8,
    ) -> Result<Self, ReplyError> {
        validate_reply(raw).map_err(|kind| {
            let code = match kind {
                ErrorKind::BadTerminator => terminator_code,
                _ => header_code,
            };
            ReplyError::new(command, kind, code)
        })?;
        Ok(ReplyCheck { command, raw })
    }

    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn fail(&self, kind: ErrorKind, code: i8) -> ReplyError {
        ReplyError::new(self.command, kind, code)
    }

    pub fn byte(&self, at: At, code: i8) -> Result<u8, ReplyError> {
        let offset = match at {
            At::Start(offset) => Some(offset),
            At::End(back) => self.raw.len().checked_sub(back),
        };
        offset
            .and_then(|offset| self.raw.pread::<u8>(offset).ok())
            .ok_or_else(|| self.fail(ErrorKind::MalformedFrame, code))
    }

    /// Expect an echoed opcode byte.
    pub fn opcode(&self, at: At, expected: u8, code: i8) -> Result<&Self, ReplyError> {
        self.expect_byte(at, expected, ErrorKind::UnexpectedOpcode, code)
    }

    /// Expect a fixed payload byte.
    pub fn field(&self, at: At, expected: u8, code: i8) -> Result<&Self, ReplyError> {
        self.expect_byte(at, expected, ErrorKind::MalformedFrame, code)
    }

    fn expect_byte(
        &self,
        at: At,
        expected: u8,
        kind: ErrorKind,
        code: i8,
    ) -> Result<&Self, ReplyError> {
        if self.byte(at, code)? == expected {
            Ok(self)
        } else {
            Err(self.fail(kind, code))
        }
    }
}

bitfield! {
    #[derive(Clone, Copy)]
    struct StatusByte0(u8);
    impl Debug;
    no_disc, _: 5;
    u8, mode, _: 3, 0;
}

bitfield! {
    #[derive(Clone, Copy)]
    struct StatusByte1(u8);
    impl Debug;
    toc_read, _: 7;
    rec_possible, _: 5;
}

bitfield! {
    #[derive(Clone, Copy)]
    struct StatusByte2(u8);
    impl Debug;
    mono, _: 7;
    copy_prohibited, _: 6;
    din_unlocked, _: 5;
    u8, input, _: 2, 0;
}

bitfield! {
    #[derive(Clone, Copy)]
    struct DiscDataByte(u8);
    impl Debug;
    u8, disc_type, _: 1, 0;
    write_protected, _: 2;
    error, _: 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscPresence {
    Loaded,
    NoDisc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Stop,
    Play,
    Pause,
    Eject,
    RecPlay,
    RecPause,
    Rehearsal,
    NotAvailableToPlay,
}

impl TransportMode {
    /// Decode the low nibble of the first status byte. Reserved patterns
    /// decode to `None`.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(TransportMode::Stop),
            0b0001 => Some(TransportMode::Play),
            0b0010 => Some(TransportMode::Pause),
            0b0011 => Some(TransportMode::Eject),
            0b0100 => Some(TransportMode::RecPlay),
            0b0101 => Some(TransportMode::RecPause),
            0b0110 => Some(TransportMode::Rehearsal),
            0b1111 => Some(TransportMode::NotAvailableToPlay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TocState {
    ReadDone,
    NotYetRead,
}

/// Shared by the record-possible and copy-protect flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Possible,
    Impossible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    Stereo,
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DinLock {
    Lock,
    Unlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Analog,
    Optical,
    Coaxial,
}

impl InputSource {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b001 => Some(InputSource::Analog),
            0b011 => Some(InputSource::Optical),
            0b101 => Some(InputSource::Coaxial),
            _ => None,
        }
    }
}

impl fmt::Display for DiscPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscPresence::Loaded => "disc loaded",
            DiscPresence::NoDisc => "no disc",
        })
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportMode::Stop => "STOP",
            TransportMode::Play => "PLAY",
            TransportMode::Pause => "PAUSE",
            TransportMode::Eject => "EJECT",
            TransportMode::RecPlay => "REC PLAY",
            TransportMode::RecPause => "REC PAUSE",
            TransportMode::Rehearsal => "rehearsal",
            TransportMode::NotAvailableToPlay => "not available to play",
        })
    }
}

impl fmt::Display for TocState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TocState::ReadDone => "read done",
            TocState::NotYetRead => "not yet read",
        })
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Permission::Possible => "possible",
            Permission::Impossible => "impossible",
        })
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelMode::Stereo => "STEREO",
            ChannelMode::Mono => "MONO",
        })
    }
}

impl fmt::Display for DinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DinLock::Lock => "lock",
            DinLock::Unlock => "unlock",
        })
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputSource::Analog => "analog",
            InputSource::Optical => "optical",
            InputSource::Coaxial => "coaxial",
        })
    }
}

/// Deck state reported by the status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub disc: DiscPresence,
    /// `None` for reserved mode patterns.
    pub mode: Option<TransportMode>,
    pub toc: TocState,
    pub rec: Permission,
    pub channels: ChannelMode,
    pub copy: Permission,
    pub din: DinLock,
    /// `None` for reserved input patterns.
    pub input: Option<InputSource>,
}

pub fn decode_status_bytes(b0: u8, b1: u8, b2: u8) -> StatusSnapshot {
    let (b0, b1, b2) = (StatusByte0(b0), StatusByte1(b1), StatusByte2(b2));
    let mode = TransportMode::from_bits(b0.mode());
    if mode.is_none() {
        log::debug!("reserved transport mode bits: {:#06b}", b0.mode());
    }

    StatusSnapshot {
        disc: if b0.no_disc() {
            DiscPresence::NoDisc
        } else {
            DiscPresence::Loaded
        },
        mode,
        toc: if b1.toc_read() {
            TocState::ReadDone
        } else {
            TocState::NotYetRead
        },
        rec: if b1.rec_possible() {
            Permission::Possible
        } else {
            Permission::Impossible
        },
        channels: if b2.mono() {
            ChannelMode::Mono
        } else {
            ChannelMode::Stereo
        },
        copy: if b2.copy_prohibited() {
            Permission::Impossible
        } else {
            Permission::Possible
        },
        din: if b2.din_unlocked() {
            DinLock::Unlock
        } else {
            DinLock::Lock
        },
        input: InputSource::from_bits(b2.input()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscType {
    Reserved,
    Recordable,
    PreMaster,
}

impl fmt::Display for DiscType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscType::Reserved => "reserved",
            DiscType::Recordable => "recordable",
            DiscType::PreMaster => "pre master",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscInfo {
    pub disc_type: DiscType,
    pub write_protected: bool,
    pub error: bool,
}

pub fn decode_disc_data(b: u8) -> DiscInfo {
    let b = DiscDataByte(b);
    DiscInfo {
        disc_type: match b.disc_type() {
            0b01 => DiscType::Recordable,
            0b10 => DiscType::PreMaster,
            _ => DiscType::Reserved,
        },
        write_protected: b.write_protected(),
        error: b.error(),
    }
}

/// Table of contents summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TocSummary {
    pub first_track: u8,
    pub last_track: u8,
    pub total_minutes: u8,
    pub total_seconds: u8,
}

impl TocSummary {
    /// Track numbers on the disc. Track 0 does not exist, so a blank disc
    /// reporting `0..=0` yields nothing.
    pub fn tracks(&self) -> RangeInclusive<u8> {
        self.first_track.max(1)..=self.last_track
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_secs(u64::from(self.total_minutes) * 60 + u64::from(self.total_seconds))
    }
}

/// Reassemble name text spread over one or more reply frames.
///
/// Each frame's text starts [`TEXT_OFFSET`] bytes after its header and runs
/// to its terminator. Null bytes are skipped, or end the frame's text when
/// `stop_at_null` is set. Both cursors only move forward, so the scan ends
/// once the terminator cursor passes the end of the buffer; a missing header
/// or terminator on the way is a [`ErrorKind::MalformedFrame`].
pub fn decode_text_spans(raw: &[u8], stop_at_null: bool) -> Result<String, ErrorKind> {
    let mut text = String::new();
    let mut header = 0;
    let mut terminator = 0;

    while terminator < raw.len() {
        header = find_byte(raw, HEADER_DECK, header).ok_or(ErrorKind::MalformedFrame)?;
        terminator = find_byte(raw, TERMINATOR, terminator).ok_or(ErrorKind::MalformedFrame)?;

        let start = header + TEXT_OFFSET;
        if start < terminator {
            for &b in &raw[start..terminator] {
                if b == 0x00 {
                    if stop_at_null {
                        break;
                    }
                    continue;
                }
                text.push(char::from(b));
            }
        }

        header = terminator;
        terminator += 1;
    }
    Ok(text)
}

fn find_byte(raw: &[u8], needle: u8, from: usize) -> Option<usize> {
    raw.get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|pos| pos + from)
}

/// Encode a name for the deck: one byte per character, `?` for anything the
/// deck cannot show, cut to [`MAX_NAME_LEN`] and closed with a null byte.
pub fn encode_name(name: &str) -> Vec<u8> {
    let mut buf: Vec<u8> = name
        .chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .take(MAX_NAME_LEN)
        .collect();
    buf.push(0x00);
    buf
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn reply(opcode_major: u8, opcode_minor: u8, payload: &[u8]) -> Vec<u8> {
        let mut raw = vec![
            HEADER_DECK,
            payload.len() as u8 + 4,
            FORMAT_TYPE,
            CATEGORY,
            opcode_major,
            opcode_minor,
        ];
        raw.extend_from_slice(payload);
        raw.push(TERMINATOR);
        raw
    }

    #[rstest]
    #[case(0x10, 0x03, vec![])]
    #[case(0x20, 0x44, vec![0x01])]
    #[case(0x20, 0x72, vec![0x05; 17])]
    #[case(0x20, 0x73, vec![0x41; MAX_PAYLOAD_LEN])]
    fn build_command_frames_payload(
        #[case] opcode_major: u8,
        #[case] opcode_minor: u8,
        #[case] payload: Vec<u8>,
    ) {
        let raw = build_command(opcode_major, opcode_minor, &payload);
        assert_eq!(payload.len() + 7, raw.len());
        assert_eq!(HEADER_PC, raw[0]);
        assert_eq!(payload.len() as u8 + 4, raw[1]);
        assert_eq!(&[FORMAT_TYPE, CATEGORY, opcode_major, opcode_minor][..], &raw[2..6]);
        assert_eq!(&payload[..], &raw[6..raw.len() - 1]);
        assert_eq!(Some(&TERMINATOR), raw.last());
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn build_command_refuses_oversized_payload() {
        build_command(0x20, 0x72, &[0x41; MAX_PAYLOAD_LEN + 1]);
    }

    #[test]
    fn remote_on_matches_wire_bytes() {
        assert_eq!(
            vec![0x7e, 0x04, 0x05, 0x47, 0x10, 0x03, 0xff],
            Command::RemoteOn.into_raw()
        );
    }

    #[test]
    fn track_name_request_carries_track_number() {
        assert_eq!(
            vec![0x7e, 0x05, 0x05, 0x47, 0x20, 0x4a, 0x07, 0xff],
            Command::track_name(7).into_raw()
        );
    }

    #[test]
    fn eject_has_no_payload() {
        assert_eq!(
            vec![0x7e, 0x04, 0x05, 0x47, 0x02, 0x40, 0xff],
            Command::Eject.into_raw()
        );
    }

    #[rstest]
    #[case(&[], ErrorKind::NoReply)]
    #[case(&[0x7e, 0x05, 0xff], ErrorKind::BadHeader)]
    #[case(&[0x00], ErrorKind::BadHeader)]
    #[case(&[0x6f, 0x05, 0x47], ErrorKind::BadTerminator)]
    #[case(&[0x6f], ErrorKind::BadTerminator)]
    fn validate_reply_rejects_bad_frames(#[case] raw: &[u8], #[case] expected: ErrorKind) {
        assert_eq!(Err(expected), validate_reply(raw));
    }

    #[test]
    fn validate_reply_accepts_concatenated_frames() {
        let mut raw = reply(0x20, 0x4a, b"\x01abc");
        raw.extend(reply(0x20, 0x4a, b"\x02def"));
        assert_eq!(Ok(()), validate_reply(&raw));
    }

    #[test]
    fn reply_check_addresses_from_both_ends() {
        let raw = reply(0x10, 0x03, &[]);
        let check = ReplyCheck::frame("remote_on", &raw, -1, -1).expect("frame is valid");
        assert_eq!(Ok(0x10), check.byte(At::Start(4), -2));
        assert_eq!(Ok(0x10), check.byte(At::End(3), -2));
        assert_eq!(Ok(0x03), check.byte(At::End(2), -3));
    }

    #[test]
    fn reply_check_reports_short_reply_as_malformed() {
        let raw = reply(0x20, 0x20, &[]);
        let check = ReplyCheck::frame("status", &raw, -1, -1).expect("frame is valid");
        assert_eq!(
            Err(ReplyError::new("status", ErrorKind::MalformedFrame, -4)),
            check.byte(At::Start(9), -4)
        );
        assert_matches!(
            check.byte(At::End(20), -2),
            Err(ReplyError {
                kind: ErrorKind::MalformedFrame,
                code: -2,
                ..
            })
        );
    }

    #[test]
    fn reply_check_splits_header_and_terminator_codes() {
        assert_matches!(
            ReplyCheck::frame("toc_data", &[0x6f, 0x00], -1, -2),
            Err(ReplyError {
                kind: ErrorKind::BadTerminator,
                code: -2,
                ..
            })
        );
        assert_matches!(
            ReplyCheck::frame("toc_data", &[], -1, -2),
            Err(ReplyError {
                kind: ErrorKind::NoReply,
                code: -1,
                ..
            })
        );
    }

    #[test]
    fn reply_check_tells_opcode_from_field_mismatch() {
        let raw = reply(0x20, 0x60, &[0x02]);
        let check = ReplyCheck::frame("toc_data", &raw, -1, -2).expect("frame is valid");
        assert_matches!(
            check.opcode(At::Start(5), 0x44, -4),
            Err(ReplyError {
                kind: ErrorKind::UnexpectedOpcode,
                code: -4,
                ..
            })
        );
        assert_matches!(
            check.field(At::Start(6), 0x01, -5),
            Err(ReplyError {
                kind: ErrorKind::MalformedFrame,
                code: -5,
                ..
            })
        );
    }

    #[test]
    fn status_decodes_playing_deck() {
        let status = decode_status_bytes(0b0000_0001, 0b1000_0000, 0b0010_0011);
        assert_eq!(
            StatusSnapshot {
                disc: DiscPresence::Loaded,
                mode: Some(TransportMode::Play),
                toc: TocState::ReadDone,
                rec: Permission::Impossible,
                channels: ChannelMode::Stereo,
                copy: Permission::Possible,
                din: DinLock::Unlock,
                input: Some(InputSource::Optical),
            },
            status
        );
    }

    #[test]
    fn status_decodes_empty_mono_deck() {
        let status = decode_status_bytes(0b0010_0000, 0b0010_0000, 0b1100_0101);
        assert_eq!(DiscPresence::NoDisc, status.disc);
        assert_eq!(Some(TransportMode::Stop), status.mode);
        assert_eq!(TocState::NotYetRead, status.toc);
        assert_eq!(Permission::Possible, status.rec);
        assert_eq!(ChannelMode::Mono, status.channels);
        assert_eq!(Permission::Impossible, status.copy);
        assert_eq!(DinLock::Lock, status.din);
        assert_eq!(Some(InputSource::Coaxial), status.input);
    }

    #[rstest]
    #[case(0b0111)]
    #[case(0b1000)]
    #[case(0b1110)]
    fn status_leaves_reserved_mode_unset(#[case] bits: u8) {
        assert_eq!(None, decode_status_bytes(bits, 0, 0).mode);
    }

    #[rstest]
    #[case(0b000)]
    #[case(0b010)]
    #[case(0b111)]
    fn status_leaves_reserved_input_unset(#[case] bits: u8) {
        assert_eq!(None, decode_status_bytes(0, 0, bits).input);
    }

    #[test]
    fn status_labels_match_deck_manual() {
        let status = decode_status_bytes(0b0000_0101, 0, 0b0000_0001);
        assert_eq!(Some("REC PAUSE".to_string()), status.mode.map(|m| m.to_string()));
        assert_eq!("disc loaded", status.disc.to_string());
        assert_eq!(Some("analog".to_string()), status.input.map(|i| i.to_string()));
    }

    #[rstest]
    #[case(0b0000, DiscType::Reserved, false, false)]
    #[case(0b0001, DiscType::Recordable, false, false)]
    #[case(0b0110, DiscType::PreMaster, true, false)]
    #[case(0b1011, DiscType::Reserved, false, true)]
    fn disc_data_decodes_bit_fields(
        #[case] byte: u8,
        #[case] disc_type: DiscType,
        #[case] write_protected: bool,
        #[case] error: bool,
    ) {
        assert_eq!(
            DiscInfo {
                disc_type,
                write_protected,
                error,
            },
            decode_disc_data(byte)
        );
    }

    #[test]
    fn text_spans_join_frames() {
        let mut raw = reply(0x20, 0x48, b"\x01Sunday ");
        raw.extend(reply(0x20, 0x48, b"\x02Mix\x00\x00"));
        assert_eq!(Ok("Sunday Mix".to_string()), decode_text_spans(&raw, false));
    }

    #[test]
    fn text_spans_stop_at_null_per_frame() {
        let raw = reply(0x20, 0x4a, b"\x01Intro\x00junk");
        assert_eq!(Ok("Intro".to_string()), decode_text_spans(&raw, true));
        assert_eq!(Ok("Introjunk".to_string()), decode_text_spans(&raw, false));
    }

    #[test]
    fn text_spans_are_idempotent() {
        let mut raw = reply(0x20, 0x4a, b"\x01hello world, ok");
        raw.extend(reply(0x20, 0x4a, b"\x02ooo\x00"));
        let first = decode_text_spans(&raw, true);
        assert_eq!(first, decode_text_spans(&raw, true));
        assert_eq!(Ok("hello world, okooo".to_string()), first);
    }

    #[rstest]
    #[case(&[0x6f, 0x05, 0x47, 0x20, 0x48, 0x01, 0x41, 0x42])]
    #[case(&[0x00, 0x05, 0x47, 0xff])]
    fn text_spans_flag_missing_delimiters(#[case] raw: &[u8]) {
        assert_eq!(Err(ErrorKind::MalformedFrame), decode_text_spans(raw, false));
    }

    #[test]
    fn text_spans_of_empty_buffer_are_empty() {
        assert_eq!(Ok(String::new()), decode_text_spans(&[], true));
    }

    #[test]
    fn empty_name_is_one_packet() {
        let packets = Command::track_name_write(3, "");
        assert_eq!(
            vec![Command::TrackNameWrite {
                track: 3,
                chunk: vec![0x00]
            }],
            packets
        );
    }

    #[test]
    fn full_chunk_name_spills_end_marker() {
        let packets = Command::track_name_write(9, "0123456789abcdef");
        assert_eq!(2, packets.len());
        assert_eq!(
            Command::TrackNameContinue {
                packet: 2,
                chunk: vec![0x00]
            },
            packets[1]
        );
        let raw = packets[0].clone().into_raw();
        assert_eq!(0x72, raw[5]);
        assert_eq!(9, raw[6]);
        assert_eq!(&b"0123456789abcdef"[..], &raw[7..23]);
    }

    #[test]
    fn long_name_numbers_continuation_packets() {
        let name = "x".repeat(40);
        let packets = Command::track_name_write(1, &name);
        let leads: Vec<(u8, u8)> = packets
            .into_iter()
            .map(|p| {
                let raw = p.into_raw();
                (raw[5], raw[6])
            })
            .collect();
        assert_eq!(vec![(0x72, 1), (0x73, 2), (0x73, 3)], leads);
    }

    #[test]
    fn encode_name_replaces_wide_chars_and_truncates() {
        assert_eq!(b"caf\xe9 ?\x00".to_vec(), encode_name("café 中"));
        let long = "a".repeat(MAX_NAME_LEN + 10);
        assert_eq!(MAX_NAME_LEN + 1, encode_name(&long).len());
    }

    #[test]
    fn toc_summary_reports_time_and_tracks() {
        let toc = TocSummary {
            first_track: 1,
            last_track: 12,
            total_minutes: 45,
            total_seconds: 30,
        };
        assert_eq!(Duration::from_secs(45 * 60 + 30), toc.total_time());
        assert_eq!(12, toc.tracks().count());
    }

    #[rstest]
    #[case(0, 0, vec![])]
    #[case(0, 3, vec![1, 2, 3])]
    #[case(2, 4, vec![2, 3, 4])]
    fn toc_tracks_never_include_track_zero(
        #[case] first_track: u8,
        #[case] last_track: u8,
        #[case] expected: Vec<u8>,
    ) {
        let toc = TocSummary {
            first_track,
            last_track,
            total_minutes: 0,
            total_seconds: 0,
        };
        assert_eq!(expected, toc.tracks().collect::<Vec<_>>());
    }
}
