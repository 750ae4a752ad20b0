//! Log entry, id, and request types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TailError;

/// Totally ordered id of a pushed log entry.
///
/// The backend assigns stream ids of the form `<millis>-<seq>`; ids compare
/// numerically, first by the millisecond part and then by the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogId {
    millis: u64,
    seq: u64,
}

impl LogId {
    /// Create an id from its parts.
    #[must_use]
    pub const fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    /// Millisecond part.
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.millis
    }

    /// Sequence part.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.seq
    }
}

impl From<u64> for LogId {
    fn from(millis: u64) -> Self {
        Self::new(millis, 0)
    }
}

impl FromStr for LogId {
    type Err = TailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TailError::InvalidLogId(s.to_string());
        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, seq),
            None => (s, "0"),
        };
        let millis = millis.parse().map_err(|_| invalid())?;
        let seq = seq.parse().map_err(|_| invalid())?;
        Ok(Self::new(millis, seq))
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl Serialize for LogId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Raw::Number(millis) => Ok(Self::from(millis)),
        }
    }
}

/// One pushed unit of a live stream. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Ordering id.
    pub id: LogId,
    /// Time the backend recorded the entry.
    #[serde(alias = "time")]
    pub timestamp: DateTime<Utc>,
    /// Short description, e.g. `"up"` or `"join"`.
    #[serde(alias = "description")]
    pub kind: String,
    /// Decoded body.
    #[serde(default, alias = "body")]
    pub payload: serde_json::Value,
    /// Indexed properties shown next to the entry.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl LogEntry {
    /// Create an entry with an empty payload and no properties.
    pub fn new(id: impl Into<LogId>, timestamp: DateTime<Utc>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            kind: kind.into(),
            payload: serde_json::Value::Null,
            properties: BTreeMap::new(),
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Attach a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// The stream a live tail follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stream", rename_all = "snake_case")]
pub enum TailRequest {
    /// Raw frames received and sent by a gateway.
    GatewayFrames {
        /// Gateway id.
        gateway_id: String,
    },
    /// Raw frames of one device.
    DeviceFrames {
        /// Device EUI.
        dev_eui: String,
    },
    /// Decoded events of one device.
    DeviceEvents {
        /// Device EUI.
        dev_eui: String,
    },
}

impl TailRequest {
    /// Gateway frame stream.
    pub fn gateway_frames(gateway_id: impl Into<String>) -> Self {
        Self::GatewayFrames {
            gateway_id: gateway_id.into(),
        }
    }

    /// Device frame stream.
    pub fn device_frames(dev_eui: impl Into<String>) -> Self {
        Self::DeviceFrames {
            dev_eui: dev_eui.into(),
        }
    }

    /// Device event stream.
    pub fn device_events(dev_eui: impl Into<String>) -> Self {
        Self::DeviceEvents {
            dev_eui: dev_eui.into(),
        }
    }

    /// Stream kind as used in URLs and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GatewayFrames { .. } => "gateway-frames",
            Self::DeviceFrames { .. } => "device-frames",
            Self::DeviceEvents { .. } => "device-events",
        }
    }

    /// Gateway id or device EUI the stream is scoped to.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::GatewayFrames { gateway_id } => gateway_id,
            Self::DeviceFrames { dev_eui } | Self::DeviceEvents { dev_eui } => dev_eui,
        }
    }
}

impl fmt::Display for TailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.target())
    }
}
