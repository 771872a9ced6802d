//! Serial Transportation.
use std::io::{Read, Write};
use std::time::Duration;

use serde::Deserialize;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::Transport;
use crate::device::parse_duration;
use crate::error::Result;

/// Line settings of the deck's RS-232 port. Data format is fixed at 8N1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SerialSettings {
    pub baudrate: u32,
    #[serde(deserialize_with = "parse_duration")]
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            baudrate: 9600,
            timeout: Duration::from_secs(2),
        }
    }
}

pub struct SerialTransport {
    serial_port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(port: &str, settings: &SerialSettings) -> Result<Self> {
        log::info!(
            "Opening serial port: \"{}\" @ {} baud 8N1",
            port,
            settings.baudrate
        );
        let port = serialport::new(port, settings.baudrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.timeout)
            .open()?;
        Ok(SerialTransport { serial_port: port })
    }
}

impl Transport for SerialTransport {
    fn write_raw(&mut self, raw: &[u8]) -> Result<usize> {
        let n = self.serial_port.write(raw)?;
        self.serial_port.flush()?;
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.serial_port.bytes_to_read()? as usize)
    }

    fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.serial_port.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        log::debug!(
            "Closing serial port: {}",
            self.serial_port.name().unwrap_or_default()
        );
    }
}
