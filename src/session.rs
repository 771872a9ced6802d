//! Deck session logic.
//!
//! Each operation writes one command frame, waits out the command's settle
//! delay, then reads whatever the deck has buffered. Requests and replies
//! strictly alternate; nothing is retried.

use std::fmt;
use std::thread::sleep;
use std::time::Duration;

use crate::constants::{major, minor};
use crate::device::DeckProfile;
use crate::error::{Error, ErrorKind, ReplyError, Result};
use crate::protocol::{
    At, Command, DiscInfo, Response, StatusSnapshot, TocSummary, decode_disc_data,
    decode_status_bytes, decode_text_spans,
};
use crate::transport::{SerialTransport, Transport};

/// Whether the deck is taking commands from the serial port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RemoteMode {
    /// Nothing confirmed yet.
    #[default]
    Unknown,
    /// Front panel in control.
    Local,
    /// Front panel locked, serial commands accepted.
    Remote,
}

impl fmt::Display for RemoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemoteMode::Unknown => "unknown",
            RemoteMode::Local => "local",
            RemoteMode::Remote => "remote",
        })
    }
}

pub struct Session<T: Transport> {
    transport: T,
    profile: DeckProfile,
    /// Only updated on a confirmed remote on/off.
    mode: RemoteMode,
}

impl Session<SerialTransport> {
    pub fn open(port: &str, profile: DeckProfile) -> Result<Self> {
        let transport = SerialTransport::open(port, &profile.serial)?;
        Ok(Session::new(transport, profile))
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, profile: DeckProfile) -> Self {
        Session {
            transport,
            profile,
            mode: RemoteMode::Unknown,
        }
    }

    pub fn profile(&self) -> &DeckProfile {
        &self.profile
    }

    pub fn mode(&self) -> RemoteMode {
        self.mode
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fails unless the last confirmed transition was into remote mode.
    pub fn ensure_remote(&self) -> Result<()> {
        match self.mode {
            RemoteMode::Remote => Ok(()),
            mode => Err(Error::NotRemote { mode }),
        }
    }

    /// Release the session and hand back its transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn close(self) {
        log::debug!("Closing session with {} (mode: {})", self.profile, self.mode);
    }

    fn exchange(&mut self, command: Command) -> Result<Response> {
        let name = command.name();
        let settle = self.profile.settle_for(&command);
        let req = command.into_raw();
        log::debug!("=> {}", hex::encode(&req));

        let written = self.transport.write_raw(&req)?;
        if written != req.len() {
            log::warn!("{}: wrote {} of {} bytes", name, written, req.len());
            return Err(ReplyError::new(name, ErrorKind::TransportWriteShort, -1).into());
        }
        sleep(settle);

        let resp = Response::new(name, self.transport.read_available()?);
        log::debug!("<= {}", hex::encode(resp.raw()));
        Ok(resp)
    }

    fn set_mode(&mut self, mode: RemoteMode) {
        if self.mode != mode {
            log::info!("Deck mode: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn remote_on(&mut self) -> Result<()> {
        let resp = self.exchange(Command::RemoteOn)?;
        resp.check(-1, -1)?
            .opcode(At::End(3), major::SYSTEM, -2)?
            .opcode(At::End(2), minor::REMOTE_ON, -3)?;
        self.set_mode(RemoteMode::Remote);
        Ok(())
    }

    pub fn remote_off(&mut self) -> Result<()> {
        let resp = self.exchange(Command::RemoteOff)?;
        resp.check(-1, -1)?
            .opcode(At::Start(4), major::SYSTEM, -2)?
            .opcode(At::Start(5), minor::REMOTE_OFF, -3)?;
        self.set_mode(RemoteMode::Local);
        Ok(())
    }

    /// Run `f` in remote mode, then hand the front panel back.
    ///
    /// `remote_off` is sent even when `remote_on` fails, since a late or
    /// truncated echo does not mean the deck stayed local. The first error
    /// wins; a failed `remote_off` after that is only logged.
    pub fn with_remote<R, E, F>(&mut self, f: F) -> std::result::Result<R, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Self) -> std::result::Result<R, E>,
    {
        let result = match self.remote_on() {
            Ok(()) => f(self),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = self.remote_off() {
            log::warn!("Could not take the deck out of remote mode: {}", e);
        }
        result
    }

    /// Unlock the front panel. Only the `remote_off` reply has to check out.
    pub fn release(&mut self) -> Result<()> {
        if let Err(e) = self.remote_on() {
            log::warn!("remote_on before release failed: {}", e);
        }
        self.remote_off()
    }

    /// Verify the deck answers with the profile's model code.
    pub fn model_request(&mut self) -> Result<()> {
        let [code_hi, code_lo] = self.profile.model_code;
        let resp = self.exchange(Command::ModelRequest)?;
        resp.check(-1, -2)?
            .opcode(At::Start(4), major::QUERY, -3)?
            .opcode(At::Start(5), minor::MODEL_REQUEST, -4)?
            .field(At::Start(6), code_hi, -5)?
            .field(At::Start(7), code_lo, -6)?;
        Ok(())
    }

    pub fn model_name(&mut self) -> Result<String> {
        let resp = self.exchange(Command::ModelName)?;
        let check = resp.check(-1, -1)?;
        check
            .opcode(At::Start(4), major::QUERY, -2)?
            .opcode(At::Start(5), minor::MODEL_NAME, -3)?;

        let raw = check.raw();
        if raw.len() <= 7 {
            return Err(check.fail(ErrorKind::MalformedFrame, -4).into());
        }
        Ok(raw[6..raw.len() - 1]
            .iter()
            .filter(|&&b| b != 0x00)
            .map(|&b| char::from(b))
            .collect())
    }

    pub fn play(&mut self) -> Result<()> {
        let resp = self.exchange(Command::Play)?;
        check_transport_reply(&resp, minor::PLAY)
    }

    /// A deck that is already stopped does not answer; that counts as success.
    pub fn stop(&mut self) -> Result<()> {
        let resp = self.exchange(Command::Stop)?;
        if resp.is_empty() {
            log::debug!("{}: no reply, deck already stopped", resp.command());
            return Ok(());
        }
        check_transport_reply(&resp, minor::STOP)
    }

    pub fn record(&mut self) -> Result<()> {
        let resp = self.exchange(Command::Record)?;
        check_transport_reply(&resp, minor::REC)
    }

    pub fn eject(&mut self) -> Result<()> {
        let resp = self.exchange(Command::Eject)?;
        check_transport_reply(&resp, minor::EJECT)
    }

    pub fn status(&mut self) -> Result<StatusSnapshot> {
        let resp = self.exchange(Command::Status)?;
        let check = resp.check(-1, -1)?;
        check
            .opcode(At::Start(4), major::QUERY, -2)?
            .opcode(At::Start(5), minor::STATUS, -3)?
            .field(At::Start(9), 0x01, -4)?;
        Ok(decode_status_bytes(
            check.byte(At::Start(6), -4)?,
            check.byte(At::Start(7), -4)?,
            check.byte(At::Start(8), -4)?,
        ))
    }

    pub fn toc_data(&mut self) -> Result<TocSummary> {
        let resp = self.exchange(Command::TocData)?;
        let check = resp.check(-1, -2)?;
        check
            .opcode(At::Start(4), major::QUERY, -3)?
            .opcode(At::Start(5), minor::TOC_DATA_REPLY, -4)?
            .field(At::Start(6), 0x01, -5)?
            .field(At::Start(11), 0x00, -6)?;
        Ok(TocSummary {
            first_track: check.byte(At::Start(7), -6)?,
            last_track: check.byte(At::Start(8), -6)?,
            total_minutes: check.byte(At::Start(9), -6)?,
            total_seconds: check.byte(At::Start(10), -6)?,
        })
    }

    pub fn disc_data(&mut self) -> Result<DiscInfo> {
        let resp = self.exchange(Command::DiscData)?;
        let check = resp.check(-1, -2)?;
        check
            .opcode(At::Start(4), major::QUERY, -3)?
            .opcode(At::Start(5), minor::DISC_DATA, -4)?
            .field(At::Start(6), 0x00, -5)?
            .field(At::Start(8), 0x00, -6)?
            .field(At::Start(9), 0x00, -7)?
            .field(At::Start(10), 0x00, -8)?;
        Ok(decode_disc_data(check.byte(At::Start(7), -8)?))
    }

    /// `None` when the disc has no name.
    pub fn disc_name(&mut self) -> Result<Option<String>> {
        let resp = self.exchange(Command::DiscName)?;
        read_name(&resp, minor::DISC_NAME, minor::NO_DISC_NAME, false)
    }

    /// Recording time left on the disc.
    pub fn rec_remain(&mut self) -> Result<Duration> {
        let resp = self.exchange(Command::RecRemain)?;
        let check = resp.check(-1, -2)?;
        check
            .opcode(At::Start(4), major::QUERY, -3)?
            .opcode(At::Start(5), minor::REC_REMAIN, -4)?
            .field(At::Start(6), 0x01, -5)?;
        let minutes = check.byte(At::Start(7), -6)?;
        let seconds = check.byte(At::Start(8), -6)?;
        Ok(Duration::from_secs(
            u64::from(minutes) * 60 + u64::from(seconds),
        ))
    }

    /// `None` when the track has no name.
    pub fn track_name(&mut self, track: u8) -> Result<Option<String>> {
        if track == 0 {
            return Err(Error::InvalidTrack(track));
        }
        let resp = self.exchange(Command::track_name(track))?;
        read_name(&resp, minor::TRACK_NAME, minor::NO_TRACK_NAME, true)
    }

    /// Write a track name, one packet per exchange.
    ///
    /// The first rejected packet aborts the write. Packets the deck already
    /// accepted stay written.
    pub fn track_name_write(&mut self, track: u8, name: &str) -> Result<()> {
        if track == 0 {
            return Err(Error::InvalidTrack(track));
        }
        let packets = Command::track_name_write(track, name);
        let total = packets.len();
        for (i, packet) in packets.into_iter().enumerate() {
            let resp = self.exchange(packet)?;
            resp.check(-1, -1)?
                .opcode(At::Start(4), major::QUERY, -2)?
                .opcode(At::Start(5), minor::NAME_ACCEPTED, -2)?;
            log::debug!("Track {} name packet {}/{} accepted", track, i + 1, total);
        }
        log::info!("Track {} named {:?}", track, name);
        Ok(())
    }
}

fn check_transport_reply(resp: &Response, expected_minor: u8) -> Result<()> {
    resp.check(-1, -1)?
        .opcode(At::End(3), major::TRANSPORT, -2)?
        .opcode(At::End(2), expected_minor, -3)?;
    Ok(())
}

fn read_name(
    resp: &Response,
    named: u8,
    unnamed: u8,
    stop_at_null: bool,
) -> Result<Option<String>> {
    let check = resp.check(-1, -2)?;
    check.opcode(At::Start(4), major::QUERY, -3)?;
    let opcode_minor = check.byte(At::Start(5), -4)?;
    if opcode_minor == unnamed {
        return Ok(None);
    }
    if opcode_minor != named {
        return Err(check.fail(ErrorKind::UnexpectedOpcode, -4).into());
    }

    trace_dump(resp.command(), resp.raw());
    let name = decode_text_spans(resp.raw(), stop_at_null)
        .map_err(|kind| check.fail(kind, -5))?;
    Ok(Some(name))
}

fn trace_dump(command: &str, raw: &[u8]) {
    if log::log_enabled!(log::Level::Trace) {
        let mut out = Vec::new();
        if hxdmp::hexdump(raw, &mut out).is_ok() {
            log::trace!("{} reply:\n{}", command, String::from_utf8_lossy(&out));
        }
    }
}
