//! Deck definition, with model-specific timing and identification
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::Command;
use crate::transport::SerialSettings;

/// How long to wait after each kind of command before reading the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SettleTimes {
    #[serde(deserialize_with = "parse_duration")]
    pub default: Duration,
    #[serde(deserialize_with = "parse_duration")]
    pub disc_name: Duration,
    #[serde(deserialize_with = "parse_duration")]
    pub track_name: Duration,
    #[serde(deserialize_with = "parse_duration")]
    pub track_name_write: Duration,
}

impl Default for SettleTimes {
    fn default() -> Self {
        SettleTimes {
            default: Duration::from_millis(500),
            disc_name: Duration::from_millis(700),
            track_name: Duration::from_secs(3),
            track_name_write: Duration::from_millis(500),
        }
    }
}

/// Represents a deck model
#[derive(Debug, Clone, Deserialize)]
pub struct DeckProfile {
    pub name: String,
    pub vendor: String,
    #[serde(default)]
    pub description: String,
    /// Expected payload of the model-request reply.
    pub model_code: [u8; 2],
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub settle: SettleTimes,
}

impl ::std::fmt::Display for DeckProfile {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(
            f,
            "{} {}(0x{:02x}{:02x})",
            self.vendor, self.name, self.model_code[0], self.model_code[1]
        )
    }
}

impl DeckProfile {
    /// The bundled MDS-E12 profile.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(include_str!("../devices/sony-mds-e12.yaml"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let raw = std::fs::read_to_string(p)?;
        let profile = Self::from_yaml(&raw)?;
        log::info!("Loaded deck profile {} from {}", profile, p.display());
        Ok(profile)
    }

    /// Same profile with every settle delay set to zero.
    pub fn without_settle(mut self) -> Self {
        self.settle = SettleTimes {
            default: Duration::ZERO,
            disc_name: Duration::ZERO,
            track_name: Duration::ZERO,
            track_name_write: Duration::ZERO,
        };
        self
    }

    pub fn settle_for(&self, command: &Command) -> Duration {
        match command {
            Command::DiscName => self.settle.disc_name,
            Command::TrackName { .. } => self.settle.track_name,
            Command::TrackNameWrite { .. } | Command::TrackNameContinue { .. } => {
                self.settle.track_name_write
            }
            _ => self.settle.default,
        }
    }
}

/// Accepts anything `humantime` reads (`"250ms"`, `"1.5s"`, `"1s 500ms"`),
/// or a bare number of milliseconds.
pub(crate) fn parse_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => humantime::parse_duration(s.trim())
            .map_err(|e| D::Error::custom(format!("error while parsing duration {:?}: {}", s, e))),
        serde_yaml::Value::Number(n) => n
            .as_u64()
            .map(Duration::from_millis)
            .ok_or_else(|| D::Error::custom(format!("expected whole milliseconds, got {}", n))),
        other => Err(D::Error::custom(format!("expected a duration, got {:?}", other))),
    }
}
